//! fieldstamp - fill a fixed-layout PDF template from field values.

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use fieldstamp::{
    AgreementForm, FieldValueMap, FormFieldPolicy, PositionRegistry, Result, StampError, Stamper,
    TemplateAsset, inspect_template_path, resolve_field_values,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "fieldstamp", version, about = "Overlay field values onto a PDF template")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill a template and write the result.
    #[command(group(ArgGroup::new("input").required(true).args(["values", "form"])))]
    Render {
        /// Template PDF.
        #[arg(short, long)]
        template: PathBuf,
        /// JSON object of placeholder name to display string.
        #[arg(long)]
        values: Option<PathBuf>,
        /// JSON agreement form; formatted into placeholder values first.
        #[arg(long)]
        form: Option<PathBuf>,
        /// Position table (JSON). Defaults to the built-in CA-66 table.
        #[arg(short, long)]
        positions: Option<PathBuf>,
        /// Font name overriding the table default.
        #[arg(long)]
        font: Option<String>,
        /// TrueType/OpenType font files to make available by family name.
        #[arg(long = "font-file")]
        font_files: Vec<PathBuf>,
        /// Expected SHA-256 of the template.
        #[arg(long)]
        sha256: Option<String>,
        /// Expected template page count.
        #[arg(long)]
        pages: Option<usize>,
        /// JSONL trace of draw and skip decisions.
        #[arg(long)]
        debug_log: Option<PathBuf>,
        /// What to do when the template has interactive form fields.
        #[arg(long, value_enum, default_value_t = FormMode::Fill)]
        form_fields: FormMode,
        /// Leave content streams uncompressed.
        #[arg(long)]
        no_compress: bool,
        /// Print the overlay report as JSON on stdout.
        #[arg(long)]
        report: bool,
        /// Output PDF.
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Report a template's version, pages, digest and form fields.
    Inspect {
        template: PathBuf,
    },
    /// List configured positions.
    Positions {
        #[arg(short, long)]
        positions: Option<PathBuf>,
        /// Only this page.
        #[arg(long)]
        page: Option<u32>,
    },
    /// Validate a position table.
    Check {
        #[arg(short, long)]
        positions: Option<PathBuf>,
        /// Treat overlapping cover regions as errors.
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormMode {
    Fill,
    Overlay,
    Reject,
}

impl From<FormMode> for FormFieldPolicy {
    fn from(mode: FormMode) -> Self {
        match mode {
            FormMode::Fill => FormFieldPolicy::Fill,
            FormMode::Overlay => FormFieldPolicy::Overlay,
            FormMode::Reject => FormFieldPolicy::Reject,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(exit_status(&err))
        }
    }
}

/// 2 for a bad position table, 1 for every other failure.
fn exit_status(err: &StampError) -> u8 {
    if err.is_configuration() { 2 } else { 1 }
}

fn load_registry(path: Option<&Path>) -> Result<PositionRegistry> {
    match path {
        Some(path) => PositionRegistry::from_json_path(path),
        None => PositionRegistry::ca66(),
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Render {
            template,
            values,
            form,
            positions,
            font,
            font_files,
            sha256,
            pages,
            debug_log,
            form_fields,
            no_compress,
            report,
            out,
        } => {
            let values = match (values, form) {
                (Some(path), _) => FieldValueMap::from_json_str(&std::fs::read_to_string(path)?)?,
                (None, Some(path)) => resolve_field_values(&AgreementForm::from_json_str(
                    &std::fs::read_to_string(path)?,
                )?),
                (None, None) => {
                    return Err(StampError::Configuration(
                        "either --values or --form is required".to_string(),
                    ));
                }
            };

            let mut builder = Stamper::builder()
                .registry(load_registry(positions.as_deref())?)
                .form_fields(form_fields.into())
                .compress(!no_compress);
            for file in font_files {
                builder = builder.register_font_file(file);
            }
            if let Some(name) = font {
                builder = builder.font(name);
            }
            if let Some(path) = debug_log {
                builder = builder.debug_log(path);
            }
            let stamper = builder.build()?;

            let mut asset = TemplateAsset::new(template);
            if let Some(digest) = sha256 {
                asset = asset.with_sha256(digest);
            }
            if let Some(count) = pages {
                asset = asset.with_page_count(count);
            }
            let (bytes, overlay_report) = stamper.generate_from_asset(&asset, &values)?;
            std::fs::write(&out, &bytes)?;
            log::info!("wrote {} ({} bytes)", out.display(), bytes.len());

            if report {
                println!("{}", serde_json::to_string_pretty(&overlay_report)?);
            } else if overlay_report.filled_fields.is_empty() {
                eprintln!(
                    "{} values drawn on {} pages",
                    overlay_report.draws.len(),
                    overlay_report.pages_modified
                );
            } else {
                eprintln!("{} form fields filled", overlay_report.filled_fields.len());
            }
            if !overlay_report.is_clean() {
                let counts: Vec<String> = overlay_report
                    .counts()
                    .into_iter()
                    .map(|(kind, count)| format!("{kind}={count}"))
                    .collect();
                eprintln!("diagnostics: {}", counts.join(" "));
            }
            Ok(())
        }
        Command::Inspect { template } => {
            let inspection = inspect_template_path(&template)?;
            println!("version\t{}", inspection.pdf_version);
            println!("pages\t{}", inspection.page_count);
            println!("encrypted\t{}", inspection.encrypted);
            println!("bytes\t{}", inspection.file_size_bytes);
            println!("sha256\t{}", inspection.sha256);
            println!("form_fields\t{}", inspection.form_field_count());
            for field in &inspection.form_fields {
                println!(
                    "field\t{}\t{:?}\t{}{}",
                    field.name,
                    field.kind,
                    if field.is_required() { "required " } else { "" },
                    if field.is_read_only() { "read-only" } else { "" }
                );
            }
            for issue in inspection.issues() {
                println!("issue\t{}", issue.as_str());
            }
            Ok(())
        }
        Command::Positions { positions, page } => {
            let registry = load_registry(positions.as_deref())?;
            let pages: Vec<u32> = match page {
                Some(page) => vec![page],
                None => (1..=registry.page_count_hint()).collect(),
            };
            for page in pages {
                for entry in registry.positions_for_page(page) {
                    let max_width = entry
                        .position
                        .max_width
                        .map(|w| format!("{w}"))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{page}\t{}\t{}\t{}\t{}\t{max_width}\t{}",
                        entry.derived_name,
                        entry.position.x,
                        entry.position.y,
                        entry.position.size,
                        entry.position.description
                    );
                }
            }
            Ok(())
        }
        Command::Check { positions, strict } => {
            let registry = load_registry(positions.as_deref())?;
            let overlaps = registry.overlapping_regions();
            for (page, a, b) in &overlaps {
                println!("overlap on page {page}: {a} and {b}");
            }
            println!(
                "{} placeholders, {} positions, {} pages, {} overlaps",
                registry.len(),
                registry.all_positions().count(),
                registry.page_count_hint(),
                overlaps.len()
            );
            if strict && !overlaps.is_empty() {
                return Err(StampError::Configuration(format!(
                    "{} overlapping cover regions",
                    overlaps.len()
                )));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_parses_strict_flag() {
        let cli = Cli::try_parse_from(["fieldstamp", "check", "--strict"]).expect("parse");
        match cli.command {
            Command::Check { positions, strict } => {
                assert!(strict);
                assert!(positions.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
        let cli = Cli::try_parse_from(["fieldstamp", "check", "-p", "table.json"]).expect("parse");
        assert!(matches!(
            cli.command,
            Command::Check { strict: false, positions: Some(_) }
        ));
    }

    #[test]
    fn render_requires_values_or_form() {
        let missing = Cli::try_parse_from(["fieldstamp", "render", "-t", "in.pdf", "-o", "out.pdf"]);
        assert!(missing.is_err());

        let both = Cli::try_parse_from([
            "fieldstamp", "render", "-t", "in.pdf", "-o", "out.pdf", "--values", "v.json",
            "--form", "f.json",
        ]);
        assert!(both.is_err());

        let cli = Cli::try_parse_from([
            "fieldstamp", "render", "-t", "in.pdf", "-o", "out.pdf", "--form", "f.json",
            "--form-fields", "reject", "--font-file", "a.ttf", "--font-file", "b.ttf",
        ])
        .expect("parse");
        match cli.command {
            Command::Render { form, form_fields, font_files, values, .. } => {
                assert_eq!(form, Some(PathBuf::from("f.json")));
                assert!(values.is_none());
                assert_eq!(form_fields, FormMode::Reject);
                assert_eq!(font_files.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn form_mode_defaults_to_fill() {
        let cli = Cli::try_parse_from([
            "fieldstamp", "render", "-t", "in.pdf", "-o", "out.pdf", "--values", "v.json",
        ])
        .expect("parse");
        let Command::Render { form_fields, .. } = cli.command else {
            panic!("expected render");
        };
        assert_eq!(FormFieldPolicy::from(form_fields), FormFieldPolicy::Fill);
    }

    #[test]
    fn strict_check_of_overlapping_table_exits_with_configuration_status() {
        let err = run(Command::Check { positions: None, strict: true })
            .expect_err("built-in table has one overlap");
        assert!(err.is_configuration());
        assert_eq!(exit_status(&err), 2);

        assert!(run(Command::Check { positions: None, strict: false }).is_ok());
    }

    #[test]
    fn other_failures_exit_with_status_one() {
        let err = run(Command::Positions {
            positions: Some(PathBuf::from("/nonexistent/fieldstamp/table.json")),
            page: None,
        })
        .expect_err("missing table");
        assert!(matches!(err, StampError::Io(_)));
        assert_eq!(exit_status(&err), 1);
        assert_eq!(
            exit_status(&StampError::Configuration("bad".to_string())),
            2
        );
    }
}
