//! In-memory session host, for embedding and tests.

use crate::app::session::SessionHost;
use crate::app::transport::{Destination, Location};
use crate::domain::model::{DocumentKind, Documents};

/// Host that keeps documents in memory and records every side effect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryHost {
    pub documents: Documents,
    pub focused: Option<DocumentKind>,
    pub replaced_locations: Vec<String>,
    pub guards_installed: usize,
    pub opened: Vec<Destination>,
}

impl MemoryHost {
    pub fn with_documents(data: &str, template: &str, vars: &str) -> Self {
        Self {
            documents: Documents {
                data: data.to_owned(),
                template: template.to_owned(),
                vars: vars.to_owned(),
            },
            ..Self::default()
        }
    }
}

impl SessionHost for MemoryHost {
    fn document(&self, kind: DocumentKind) -> String {
        self.documents.get(kind).to_owned()
    }

    fn set_document(&mut self, kind: DocumentKind, text: String) {
        self.documents.set(kind, text);
    }

    fn focus(&mut self, kind: DocumentKind) {
        self.focused = Some(kind);
    }

    fn replace_location(&mut self, location: &Location) {
        self.replaced_locations.push(location.path().to_owned());
    }

    fn install_unload_guard(&mut self) {
        self.guards_installed += 1;
    }

    fn open(&mut self, destination: &Destination) {
        self.opened.push(destination.clone());
    }
}
