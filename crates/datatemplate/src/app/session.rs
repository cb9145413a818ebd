//! Session lifecycle: loading bundles into the editing surfaces and tracking unsaved edits.

use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::app::codec::{TransportCharset, TransportCodec};
use crate::app::detect::detect;
use crate::app::normalize::TextNormalizer;
use crate::app::status::{StatusBanner, StatusMessage};
use crate::app::transport::{Destination, Location, generate_destination, validate_for_generate};
use crate::domain::errors::DataTemplateError;
use crate::domain::model::{Bundle, DocumentKind, Documents};
use crate::infra::config::Config;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Startup restore has not finished.
    #[default]
    Initializing,
    /// Loaded with no unsaved edits.
    Clean,
    /// At least one edit since load. Never reverts within a session.
    Dirty,
}

/// Where a content change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    Edit,
    /// Synthetic change recorded while recovering from a failed load.
    ErrorRecovery,
}

/// Result of feeding a change into [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEffect {
    /// The session is still initializing.
    Ignored,
    Unchanged,
    /// First edit of the session; the unload guard must be installed now.
    BecameDirty,
}

/// Lifecycle state machine. Mutated only through its transition methods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    phase: Phase,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loaded(&self) -> bool {
        self.phase != Phase::Initializing
    }

    pub fn is_dirty(&self) -> bool {
        self.phase == Phase::Dirty
    }

    /// `Initializing -> Clean`. Returns `true` if the transition happened.
    pub fn mark_loaded(&mut self) -> bool {
        if self.phase == Phase::Initializing {
            self.phase = Phase::Clean;
            true
        } else {
            false
        }
    }

    pub fn record_change(&mut self, origin: ChangeOrigin) -> ChangeEffect {
        match (self.phase, origin) {
            (Phase::Initializing, _) => ChangeEffect::Ignored,
            (Phase::Clean, ChangeOrigin::Edit) => {
                self.phase = Phase::Dirty;
                ChangeEffect::BecameDirty
            }
            _ => ChangeEffect::Unchanged,
        }
    }
}

/// The editing surfaces and browser plumbing a session drives.
pub trait SessionHost {
    /// Current text of a document surface.
    fn document(&self, kind: DocumentKind) -> String;

    /// Replace the text of a document surface.
    fn set_document(&mut self, kind: DocumentKind, text: String);

    fn focus(&mut self, kind: DocumentKind);

    /// Replace the visible location without navigating.
    fn replace_location(&mut self, location: &Location);

    /// Intercept session termination while there are unsaved edits.
    fn install_unload_guard(&mut self);

    /// Open a destination in a new browsing context.
    fn open(&mut self, destination: &Destination);
}

/// How absent bundle fields are treated when applying a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Absent fields clear their document.
    Full,
    /// Absent fields keep their document's current text.
    Overlay,
}

/// What happened to pasted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteOutcome {
    /// The paste was a bundle and has been loaded; the raw paste should be discarded.
    Consumed(Bundle),
    /// Ordinary text; the surface should paste it normally.
    PassThrough,
}

/// Runtime options for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub normalizer: TextNormalizer,
    pub codec: TransportCodec,
    pub output_page: String,
    pub export_page: String,
    pub clear_status_after: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            normalizer: TextNormalizer::default(),
            codec: TransportCodec::default(),
            output_page: "output.html".into(),
            export_page: "dt.html".into(),
            clear_status_after: crate::app::status::DEFAULT_CLEAR_AFTER,
        }
    }
}

impl SessionOptions {
    /// Build options from configuration. An unknown transport charset is an error.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let charset = config
            .transport
            .charset()
            .parse::<TransportCharset>()
            .context("invalid transport charset")?;
        Ok(Self {
            normalizer: TextNormalizer::from_config(config),
            codec: TransportCodec::new(charset),
            output_page: config.share.output_page.clone(),
            export_page: config.share.export_page.clone(),
            clear_status_after: Duration::from_secs(config.status.clear_after_secs()),
        })
    }
}

/// Controller owning the session state and driving a host.
pub struct Session<H: SessionHost> {
    host: H,
    state: SessionState,
    options: SessionOptions,
    status: StatusBanner,
    location: Location,
    last_file_name: Option<String>,
}

impl<H: SessionHost> Session<H> {
    pub fn new(host: H, state: SessionState, options: SessionOptions) -> Self {
        let status = StatusBanner::new(options.clear_status_after);
        Self {
            host,
            state,
            options,
            status,
            location: Location::default(),
            last_file_name: None,
        }
    }

    /// Seed the file name remembered from an import in an earlier session.
    pub fn with_last_file_name(mut self, name: Option<String>) -> Self {
        self.last_file_name = name;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.current()
    }

    /// Name of the most recently imported file.
    pub fn last_file_name(&self) -> Option<&str> {
        self.last_file_name.as_deref()
    }

    /// Expire the status message once its delay has passed.
    pub fn tick(&mut self, now: Instant) {
        self.status.tick(now);
    }

    /// Snapshot of the live documents.
    pub fn current(&self) -> Documents {
        let mut documents = Documents::default();
        for kind in DocumentKind::ALL {
            documents.set(kind, self.host.document(kind));
        }
        documents
    }

    /// Consume the location's query once and finish loading.
    ///
    /// Always leaves the session loaded. A decode failure applies nothing and is reported as
    /// [`DataTemplateError::Restore`].
    pub fn start(&mut self, location: Location) -> Result<(), DataTemplateError> {
        self.location = location;

        let result = if self.location.has_query() {
            self.restore_from_query()
        } else {
            Ok(())
        };

        if self.state.mark_loaded() {
            info!(query = self.location.has_query(), "session loaded");
        }
        self.strip_query();

        if let Err(err) = &result {
            warn!(error = %err, "restore from query failed");
            self.report(err);
            self.notify_change(ChangeOrigin::ErrorRecovery);
        }
        result
    }

    fn restore_from_query(&mut self) -> Result<(), DataTemplateError> {
        let params = self.location.query_parameters();
        match params.decode_bundle(&self.options.codec) {
            Ok(Some(bundle)) => {
                debug!(fields = bundle.fields().count(), "restoring bundle from query");
                self.apply(&bundle, LoadMode::Overlay);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => Err(DataTemplateError::Restore(err.to_string())),
        }
    }

    /// Content-change hook for the editing surfaces.
    pub fn notify_change(&mut self, origin: ChangeOrigin) -> ChangeEffect {
        let effect = self.state.record_change(origin);
        if effect == ChangeEffect::BecameDirty {
            debug!("session dirty, installing unload guard");
            self.host.install_unload_guard();
        }
        if self.state.is_loaded() {
            self.strip_query();
        }
        effect
    }

    /// Apply a bundle with absent fields cleared.
    pub fn load_full(&mut self, bundle: &Bundle) {
        self.apply(bundle, LoadMode::Full);
    }

    /// Apply a bundle with absent fields left untouched.
    pub fn overlay(&mut self, bundle: &Bundle) {
        self.apply(bundle, LoadMode::Overlay);
    }

    fn apply(&mut self, bundle: &Bundle, mode: LoadMode) {
        let normalized = self.options.normalizer.normalize_bundle(bundle);
        for kind in DocumentKind::ALL {
            let text = match (normalized.get(kind), mode) {
                (Some(text), _) => text.to_string(),
                (None, LoadMode::Full) => String::new(),
                (None, LoadMode::Overlay) => continue,
            };
            self.host.set_document(kind, text);
            self.notify_change(ChangeOrigin::Edit);
        }
    }

    /// Intercept a paste. Bundles replace the documents; anything else passes through silently.
    pub fn paste(&mut self, text: &str) -> PasteOutcome {
        match detect(text, false) {
            Ok(Some(bundle)) => {
                info!("pasted text is a bundle");
                self.load_full(&bundle);
                PasteOutcome::Consumed(bundle)
            }
            _ => PasteOutcome::PassThrough,
        }
    }

    /// Load an imported file's contents, which must be a bundle.
    pub fn import(
        &mut self,
        text: &str,
        file_name: Option<&str>,
    ) -> Result<Bundle, DataTemplateError> {
        match detect(text, true) {
            Ok(Some(bundle)) => {
                self.load_full(&bundle);
                if let Some(name) = file_name {
                    self.last_file_name = Some(name.to_string());
                }
                info!(file = file_name.unwrap_or("<unnamed>"), "imported bundle");
                Ok(bundle)
            }
            Ok(None) => Err(self.fail(DataTemplateError::InvalidFormat)),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Validate and hand the encoded documents to the rendering engine.
    pub fn generate(&mut self) -> Result<Destination, DataTemplateError> {
        self.status.clear();
        let documents = self.current();
        if let Err(err) = validate_for_generate(&documents) {
            return Err(self.fail(err));
        }

        let normalized = self.options.normalizer.normalize_documents(&documents);
        let destination =
            generate_destination(&self.options.output_page, &self.options.codec, &normalized)
                .map_err(|err| {
                    warn!(error = %err, "failed to encode documents");
                    self.fail(err.into())
                })?;
        self.host.open(&destination);
        Ok(destination)
    }

    /// Validate and open the export page, which reads the live documents itself.
    pub fn export(&mut self) -> Result<Destination, DataTemplateError> {
        self.status.clear();
        if let Err(err) = validate_for_generate(&self.current()) {
            return Err(self.fail(err));
        }
        let destination = Destination::new(self.options.export_page.clone());
        self.host.open(&destination);
        Ok(destination)
    }

    fn strip_query(&mut self) {
        if self.location.has_query() {
            self.location.strip_query();
            self.host.replace_location(&self.location);
        }
    }

    fn report(&mut self, err: &DataTemplateError) {
        self.status.show(StatusMessage::from(err), Instant::now());
    }

    fn fail(&mut self, err: DataTemplateError) -> DataTemplateError {
        self.report(&err);
        if let Some(kind) = err.focus_target() {
            self.host.focus(kind);
        }
        err
    }
}
