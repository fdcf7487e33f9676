pub mod config;
pub mod error;

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use gridkeep_core::{GridRange, GridStore, Workbook};
use gridkeep_schema::{
    build_named_ranges, locate_sheet, BatchReport, SchemaConfig, SchemaRegistry, Scope,
};
use gridkeep_table::{HeaderIndex, DEFAULT_HEADER_ROW};

use crate::config::Config;
use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "gridkeep", about = "Keep a workbook in line with its schema tags.")]
pub struct Args {
    /// Workbook JSON file. Overrides `GRIDKEEP_WORKBOOK`.
    #[arg(long, global = true, value_name = "PATH")]
    pub workbook: Option<PathBuf>,

    /// Schema configuration JSON file. Overrides `GRIDKEEP_SCHEMA`.
    #[arg(long, global = true, value_name = "PATH")]
    pub schema: Option<PathBuf>,

    /// Run the command but leave the workbook file untouched.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Print `assess` and `tags` results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Tag configured sheets and columns that carry no tags yet.
    BuildMetadata,
    /// Remove every tag and tag the workbook again from its current layout.
    RebuildMetadata,
    /// Remove every tag.
    ClearMetadata,
    /// Restore sheet names, header names, number formats and validation rules.
    Repair,
    /// Rename sheets back to their tagged names.
    FixSheetNames,
    /// Restore the tagged header names of one sheet.
    FixHeaders {
        #[arg(long)]
        sheet: String,
    },
    /// Re-apply tagged number formats.
    FixFormats {
        #[arg(long)]
        sheet: Option<String>,
    },
    /// Re-apply tagged data validation rules.
    FixValidation {
        #[arg(long)]
        sheet: Option<String>,
    },
    /// Create or extend the configured named ranges.
    NamedRanges,
    /// Compare configured columns with the live header rows.
    Assess,
    /// List header tags and the columns they sit on.
    Tags,
}

impl Command {
    fn mutates(&self) -> bool {
        !matches!(self, Command::Assess | Command::Tags)
    }

    fn needs_schema(&self) -> bool {
        matches!(
            self,
            Command::BuildMetadata
                | Command::RebuildMetadata
                | Command::NamedRanges
                | Command::Assess
        )
    }
}

/// What a command printed and how many of its items failed
#[derive(Debug, Default)]
pub struct Output {
    pub text: String,
    pub failed: usize,
    pub total: usize,
}

impl Output {
    fn from_report(report: &BatchReport) -> Self {
        let mut text = String::new();
        for item in report.changed() {
            let _ = writeln!(text, "changed  {}", item);
        }
        for (item, e) in report.failures() {
            let _ = writeln!(text, "failed   {}: {}", item, e);
        }
        let _ = writeln!(text, "{}", report);
        Self {
            text,
            failed: report.failure_count(),
            total: report.len(),
        }
    }

    fn plain(text: String) -> Self {
        Self {
            text,
            ..Self::default()
        }
    }

    /// Turn item failures into an error once the output has been shown
    pub fn into_result(self) -> Result<(), CliError> {
        if self.failed > 0 {
            return Err(CliError::PartialFailure {
                failed: self.failed,
                total: self.total,
            });
        }
        Ok(())
    }
}

fn scope(workbook: &Workbook, sheet: Option<&str>) -> Result<Scope, CliError> {
    match sheet {
        None => Ok(Scope::Workbook),
        Some(name) => locate_sheet(workbook, name)
            .map(Scope::Sheet)
            .ok_or_else(|| CliError::SheetNotFound(name.to_string())),
    }
}

/// Run one command against an already loaded workbook
pub fn execute(
    command: &Command,
    workbook: &mut Workbook,
    schema: SchemaConfig,
    json: bool,
) -> anyhow::Result<Output> {
    let mut index = HeaderIndex::new();
    let registry = SchemaRegistry::new(schema);

    let output = match command {
        Command::BuildMetadata => Output::from_report(&registry.build_metadata(workbook, &mut index)),
        Command::RebuildMetadata => {
            Output::from_report(&registry.rebuild_all_metadata(workbook, &mut index))
        }
        Command::ClearMetadata => Output::from_report(&registry.clear_metadata(workbook)),
        Command::Repair => Output::from_report(&registry.repair_sheets(workbook, &mut index)),
        Command::FixSheetNames => Output::from_report(&registry.fix_sheet_names(workbook)),
        Command::FixHeaders { sheet } => {
            let id = locate_sheet(&*workbook, sheet)
                .ok_or_else(|| CliError::SheetNotFound(sheet.clone()))?;
            let row = GridRange::new(id, DEFAULT_HEADER_ROW, 1, 1, workbook.max_columns(id)?);
            let text = match registry.fix_header_names(workbook, &mut index, &row)? {
                Some(written) => format!("Rewrote {}!{}\n", workbook.sheet_name(id)?, written),
                None => format!("Headers of '{}' already match\n", sheet),
            };
            Output::plain(text)
        }
        Command::FixFormats { sheet } => {
            let scope = scope(workbook, sheet.as_deref())?;
            Output::from_report(&registry.fix_number_formatting(workbook, scope))
        }
        Command::FixValidation { sheet } => {
            let scope = scope(workbook, sheet.as_deref())?;
            Output::from_report(&registry.fix_data_validation(workbook, scope))
        }
        Command::NamedRanges => {
            Output::from_report(&build_named_ranges(workbook, &mut index, registry.config()))
        }
        Command::Assess => {
            let assessments = registry.assess_metadata(&*workbook, &mut index)?;
            if json {
                Output::plain(serde_json::to_string_pretty(&assessments)? + "\n")
            } else {
                let mut text = String::new();
                for a in &assessments {
                    if !a.found {
                        let _ = writeln!(text, "{}: not found", a.sheet);
                        continue;
                    }
                    let _ = writeln!(
                        text,
                        "{}{}: present [{}] missing [{}] untracked [{}]",
                        a.sheet,
                        if a.tagged { "" } else { " (untagged)" },
                        a.present.join(", "),
                        a.missing.join(", "),
                        a.untracked.join(", ")
                    );
                }
                Output::plain(text)
            }
        }
        Command::Tags => {
            let tags = registry.tagged_headers(&*workbook)?;
            if json {
                Output::plain(serde_json::to_string_pretty(&tags)? + "\n")
            } else {
                let mut text = String::new();
                for tag in &tags {
                    let _ = writeln!(text, "{}\t{}", tag.location, tag.header);
                }
                Output::plain(text)
            }
        }
    };

    Ok(output)
}

fn load_workbook(path: &Path) -> anyhow::Result<Workbook> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read workbook {}", path.display()))?;
    Workbook::from_json(&json).with_context(|| format!("Failed to parse workbook {}", path.display()))
}

/// Load the workbook, run the command and save the workbook back unless it is a dry run
pub fn run(args: Args, config: Config) -> anyhow::Result<Output> {
    let config = config.with_overrides(args.workbook, args.schema);
    let path = config.workbook.ok_or(CliError::MissingWorkbook)?;
    let mut workbook = load_workbook(&path)?;

    let schema = match config.schema {
        Some(schema) => SchemaConfig::load(&schema)
            .with_context(|| format!("Failed to load schema {}", schema.display()))?,
        None if args.command.needs_schema() => return Err(CliError::MissingSchema.into()),
        None => SchemaConfig::default(),
    };

    let output = execute(&args.command, &mut workbook, schema, args.json)?;

    if args.command.mutates() {
        if args.dry_run {
            tracing::info!("Dry run, {} left unchanged", path.display());
        } else {
            fs::write(&path, workbook.to_json_pretty()?)
                .with_context(|| format!("Failed to write workbook {}", path.display()))?;
            tracing::info!("Saved {}", path.display());
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridkeep_core::{CellValue, MetadataQuery};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const SCHEMA: &str = r#"{
        "sheets": [
            { "name": "Trips", "columns": [
                { "headerName": "Date", "numberFormat": "yyyy-mm-dd" },
                { "headerName": "Driver", "dataValidation": { "criteriaType": "VALUE_IN_RANGE", "namedRange": "lookupDrivers" } }
            ] },
            { "name": "Drivers", "columns": [{ "headerName": "Name" }] }
        ],
        "namedRanges": { "lookupDrivers": { "sheetName": "Drivers", "headerName": "Name" } }
    }"#;

    fn workbook() -> Workbook {
        let mut wb = Workbook::empty("Fleet");
        let trips = wb.add_sheet_with_size("Trips", 20, 4).unwrap();
        let drivers = wb.add_sheet_with_size("Drivers", 10, 2).unwrap();
        wb.set_values(
            &GridRange::new(trips, 1, 1, 1, 3),
            &[vec!["Date".into(), "Fare".into(), "Driver".into()]],
        )
        .unwrap();
        wb.set_values(&GridRange::new(drivers, 1, 1, 2, 1), &[vec!["Name".into()], vec!["Ana".into()]])
            .unwrap();
        wb
    }

    fn files(dir: &TempDir) -> (PathBuf, PathBuf) {
        let workbook_path = dir.path().join("fleet.json");
        let schema_path = dir.path().join("schema.json");
        fs::write(&workbook_path, workbook().to_json().unwrap()).unwrap();
        fs::write(&schema_path, SCHEMA).unwrap();
        (workbook_path, schema_path)
    }

    fn args(line: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("gridkeep").chain(line.iter().copied())).unwrap()
    }

    fn config(workbook: &Path, schema: &Path) -> Config {
        Config {
            workbook: Some(workbook.to_path_buf()),
            schema: Some(schema.to_path_buf()),
            ..Config::default()
        }
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(&["fix-headers", "--sheet", "Trips", "--dry-run"]);
        assert_eq!(parsed.command, Command::FixHeaders { sheet: "Trips".into() });
        assert!(parsed.dry_run);

        assert!(Args::try_parse_from(["gridkeep", "fix-headers"]).is_err());
    }

    #[test]
    fn test_build_then_repair_round_trip() {
        let dir = TempDir::new().unwrap();
        let (workbook_path, schema_path) = files(&dir);

        let built = run(args(&["build-metadata"]), config(&workbook_path, &schema_path)).unwrap();
        assert_eq!(built.failed, 0);
        run(args(&["named-ranges"]), config(&workbook_path, &schema_path)).unwrap();

        let mut saved = load_workbook(&workbook_path).unwrap();
        let trips = saved.sheet_by_name("Trips").unwrap();
        assert_eq!(saved.find_metadata(&MetadataQuery::columns().in_sheet(trips)).len(), 4);
        assert!(saved.range_by_name("lookupDrivers").is_some());

        saved
            .set_values(&GridRange::new(trips, 1, 3, 1, 1), &[vec![CellValue::from("Chauffeur")]])
            .unwrap();
        fs::write(&workbook_path, saved.to_json().unwrap()).unwrap();

        let repaired = run(args(&["repair"]), config(&workbook_path, &schema_path)).unwrap();
        assert!(repaired.into_result().is_ok());

        let saved = load_workbook(&workbook_path).unwrap();
        assert_eq!(
            saved.values(&GridRange::new(trips, 1, 3, 1, 1)).unwrap(),
            vec![vec![CellValue::from("Driver")]]
        );
    }

    #[test]
    fn test_dry_run_leaves_file() {
        let dir = TempDir::new().unwrap();
        let (workbook_path, schema_path) = files(&dir);
        let before = fs::read_to_string(&workbook_path).unwrap();

        let output = run(
            args(&["build-metadata", "--dry-run"]),
            config(&workbook_path, &schema_path),
        )
        .unwrap();
        assert!(output.text.contains("changed  Trips"));
        assert_eq!(fs::read_to_string(&workbook_path).unwrap(), before);
    }

    #[test]
    fn test_missing_paths() {
        let err = run(args(&["tags"]), Config::default()).unwrap_err();
        assert!(matches!(err.downcast_ref::<CliError>(), Some(CliError::MissingWorkbook)));

        let dir = TempDir::new().unwrap();
        let (workbook_path, _) = files(&dir);
        let config = Config {
            workbook: Some(workbook_path),
            ..Config::default()
        };
        let err = run(args(&["assess"]), config).unwrap_err();
        assert!(matches!(err.downcast_ref::<CliError>(), Some(CliError::MissingSchema)));
    }

    #[test]
    fn test_tags_and_assess_output() {
        let mut wb = workbook();
        let schema = SchemaConfig::from_json(SCHEMA).unwrap();
        execute(&Command::BuildMetadata, &mut wb, schema.clone(), false).unwrap();

        let tags = execute(&Command::Tags, &mut wb, SchemaConfig::default(), false).unwrap();
        assert_eq!(tags.text, "Drivers!A:A\tName\nTrips!A:A\tDate\nTrips!C:C\tDriver\n");

        let assess = execute(&Command::Assess, &mut wb, schema, false).unwrap();
        assert!(assess.text.contains("Trips: present [Date, Driver] missing [] untracked [Fare]"));
    }

    #[test]
    fn test_unknown_sheet() {
        let mut wb = workbook();
        let command = Command::FixHeaders { sheet: "Vehicles".into() };
        let err = execute(&command, &mut wb, SchemaConfig::default(), false).unwrap_err();
        assert!(matches!(err.downcast_ref::<CliError>(), Some(CliError::SheetNotFound(_))));
    }
}
