use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use datatemplate::app::codec::serialize;
use datatemplate::app::export::{ExportFormat, ExportOptions, Exporter, default_file_name};
use datatemplate::app::session::{PasteOutcome, Session, SessionOptions, SessionState};
use datatemplate::app::status::StatusMessage;
use datatemplate::app::transport::{Location, share_url};
use datatemplate::domain::errors::DataTemplateError;
use datatemplate::infra::clipboard::Clipboard;
use datatemplate::infra::config::Config;
use datatemplate::infra::workspace::WorkspaceHost;

#[derive(Parser)]
#[command(
    name = "datatemplate",
    author,
    version,
    about = "Move data, template and vars documents between files, the clipboard and share links"
)]
struct Cli {
    /// Directory holding data.csv, template.j2 and vars.yml
    #[arg(short, long, global = true, default_value = ".")]
    workspace: PathBuf,
    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Show debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a tagged bundle file into the workspace, replacing all three documents
    Import { file: PathBuf },
    /// Load a bundle from the clipboard, if the clipboard holds one
    Paste,
    /// Restore documents from a share link
    Restore { url: String },
    /// Print the workspace documents
    Show {
        #[arg(long, value_enum, default_value_t = ExportFormat::Dt)]
        format: ExportFormat,
    },
    /// Copy the workspace as a tagged bundle to the clipboard
    Copy,
    /// Print a link that restores the workspace
    Share,
    /// Validate the documents and print the rendering link
    Generate,
    /// Validate the documents and write an export
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Dt)]
        format: ExportFormat,
        /// Output file; defaults to datatemplate.<ext> in the workspace
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print to stdout instead of writing a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
        /// Also copy the export to the clipboard
        #[arg(long)]
        copy: bool,
    },
    /// Print shell completions
    Completions { shell: Shell },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    datatemplate::init(cli.quiet, cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<DataTemplateError>() {
                Some(dt_err) => eprintln!("{}", StatusMessage::from(dt_err)),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "datatemplate", &mut io::stdout());
        return Ok(());
    }

    let config = Config::load_from(&cli.workspace)?;
    let host = WorkspaceHost::open(&cli.workspace, &config)?;
    let last_import = host.last_import().map(ToOwned::to_owned);
    let options = SessionOptions::from_config(&config)?;
    let mut session =
        Session::new(host, SessionState::new(), options).with_last_file_name(last_import);

    let location = match &cli.command {
        Commands::Restore { url } => Location::parse(url),
        _ => Location::default(),
    };
    let outcome = session
        .start(location)
        .map_err(anyhow::Error::from)
        .and_then(|()| execute(&mut session, &config, &cli));

    let written = session.into_host().close()?;
    for path in written {
        note(cli.quiet, format!("wrote {}", path.display()));
    }
    outcome
}

fn execute(session: &mut Session<WorkspaceHost>, config: &Config, cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Import { file } => {
            let text = fs::read_to_string(file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let name = file.file_name().and_then(|name| name.to_str());
            session.import(&text, name)?;
            if let Some(name) = name {
                session.host_mut().record_import(name)?;
            }
            note(cli.quiet, format!("imported {}", file.display()));
        }
        Commands::Paste => {
            let text = Clipboard::new().paste()?;
            match session.paste(&text) {
                PasteOutcome::Consumed(_) => note(cli.quiet, "loaded bundle from clipboard"),
                PasteOutcome::PassThrough => {
                    note(cli.quiet, "clipboard does not hold a bundle, nothing loaded")
                }
            }
        }
        Commands::Restore { .. } => {
            // Restoring never dirties the session, so save explicitly.
            for path in session.host_mut().save()? {
                note(cli.quiet, format!("wrote {}", path.display()));
            }
        }
        Commands::Show { format } => {
            let options = ExportOptions::new(*format);
            let rendered = Exporter::new()?.render(&session.current(), &options)?;
            print!("{rendered}");
        }
        Commands::Copy => {
            Clipboard::new().copy(&serialize(&session.current().to_bundle()))?;
            note(cli.quiet, "copied bundle to clipboard");
        }
        Commands::Share => {
            let base = config.share.base_url()?;
            let url = share_url(&base, &session.options().codec, &session.current().to_bundle())
                .map_err(DataTemplateError::from)?;
            println!("{url}");
        }
        Commands::Generate => {
            session.generate()?;
            if let Some(url) = session.host().opened().last() {
                println!("{url}");
            }
        }
        Commands::Export {
            format,
            output,
            stdout,
            copy,
        } => {
            session.export()?;
            let mut options = ExportOptions::new(*format);
            options.title = session.last_file_name().map(ToString::to_string);
            options.copy_to_clipboard = *copy;
            if !*stdout {
                let path = output.clone().unwrap_or_else(|| {
                    default_output(session.host().root(), session.last_file_name(), *format)
                });
                options.output_path = Some(path);
            }

            let result = Exporter::new()?.export(&session.current(), &options)?;
            match &result.output_path {
                Some(path) => note(cli.quiet, format!("exported to {}", path.display())),
                None => print!("{}", result.rendered),
            }
            if result.copied_to_clipboard {
                note(cli.quiet, "copied export to clipboard");
            }
        }
        Commands::Completions { .. } => {}
    }
    Ok(())
}

fn default_output(root: &Path, last_file_name: Option<&str>, format: ExportFormat) -> PathBuf {
    root.join(default_file_name(last_file_name, format))
}

fn note(quiet: bool, message: impl AsRef<str>) {
    if !quiet {
        eprintln!("{}", message.as_ref());
    }
}
