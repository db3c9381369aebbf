use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use gitgo_index::{
    Address, Index, IndexConfig, IndexEntry, Lookup, PersistedIndex, SnapshotFileBackend, Stage,
};
use gitgo_types::ContentHasher;
use serde_json::json;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Init(args) => cmd_init(&config, args, format),
        Command::Add(args) => cmd_add(&config, args, format),
        Command::Update(args) => cmd_update(&config, args, format),
        Command::Rm(args) => cmd_rm(&config, args, format),
        Command::Show(args) => cmd_show(&config, args, format),
        Command::LsFiles(args) => cmd_ls_files(&config, args, format),
        Command::Count(_) => cmd_count(&config, format),
    }
}

/// Config file first, then command-line overrides.
fn resolve_config(cli: &Cli) -> anyhow::Result<IndexConfig> {
    let mut config = match &cli.config {
        Some(path) => IndexConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => IndexConfig::default(),
    };
    if let Some(path) = &cli.index {
        config.path = path.clone();
    }
    if let Some(version) = cli.index_version {
        config.version = version;
    }
    config.validate()?;
    Ok(config)
}

fn open_index(config: &IndexConfig) -> anyhow::Result<PersistedIndex> {
    PersistedIndex::from_config(config)
        .with_context(|| format!("opening index {}", config.path.display()))
}

fn save_index(persisted: &PersistedIndex) -> anyhow::Result<()> {
    persisted
        .save()
        .with_context(|| format!("saving index {}", persisted.path().display()))
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------
// Commands
// ---------------------------------------------------------------

fn cmd_init(config: &IndexConfig, args: InitArgs, format: OutputFormat) -> anyhow::Result<()> {
    if config.path.exists() && !args.force {
        bail!(
            "index already exists at {} (use --force to replace it)",
            config.path.display()
        );
    }
    let backend = SnapshotFileBackend::new().with_fsync(config.fsync);
    let persisted =
        PersistedIndex::create(config.path.clone(), Arc::new(backend), config.validate()?);
    save_index(&persisted)?;

    let version = persisted.index().version();
    match format {
        OutputFormat::Json => print_json(&json!({
            "path": persisted.path(),
            "version": version.number(),
        })),
        OutputFormat::Text => {
            println!(
                "{} Initialized empty index (version {}) at {}",
                "✓".green().bold(),
                version,
                persisted.path().display().to_string().bold()
            );
            Ok(())
        }
    }
}

fn cmd_add(config: &IndexConfig, args: AddArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut persisted = open_index(config)?;
    let root = work_root(&config.path)?;
    let index_file = fs::canonicalize(&config.path).ok();
    let report = stage_paths(
        persisted.index_mut(),
        &root,
        &args.paths,
        index_file.as_deref(),
    )?;
    save_index(&persisted)?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "staged": report.staged,
            "replaced": report
                .replaced
                .iter()
                .map(|(from, to)| json!({ "from": from, "to": to }))
                .collect::<Vec<_>>(),
        })),
        OutputFormat::Text => {
            for (from, to) in &report.replaced {
                println!("  {} {} -> {}", "replaced:".yellow(), from, to);
            }
            for entry in &report.staged {
                println!("  {} {}", "staged:".green(), entry.name());
            }
            Ok(())
        }
    }
}

fn cmd_update(config: &IndexConfig, args: UpdateArgs, format: OutputFormat) -> anyhow::Result<()> {
    let address: Address = args.address.parse()?;
    let entry = file_entry(&args.file, &work_root(&config.path)?)?;
    let mut persisted = open_index(config)?;
    persisted
        .index_mut()
        .set(address, entry.clone())
        .with_context(|| format!("updating {address}"))?;
    save_index(&persisted)?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "address": address.to_string(),
            "entry": entry,
        })),
        OutputFormat::Text => {
            println!(
                "{} {} <- {}",
                "updated".green(),
                address.to_string().yellow(),
                entry.name()
            );
            Ok(())
        }
    }
}

fn cmd_rm(config: &IndexConfig, args: RmArgs, format: OutputFormat) -> anyhow::Result<()> {
    let address: Address = args.address.parse()?;
    let mut persisted = open_index(config)?;
    let removed = persisted.index_mut().remove(address);
    save_index(&persisted)?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "address": address.to_string(),
            "removed": removed,
        })),
        OutputFormat::Text => {
            println!("Removed {} entries at {}", removed, address.to_string().yellow());
            Ok(())
        }
    }
}

fn cmd_show(config: &IndexConfig, args: ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    let address: Address = args.address.parse()?;
    let persisted = open_index(config)?;
    let lookup = persisted.index().get(address);

    match (format, lookup) {
        (OutputFormat::Json, Lookup::Entry(entry)) => print_json(&json!({
            "address": address.to_string(),
            "entry": entry,
        })),
        (OutputFormat::Json, Lookup::Stages(slots)) => print_json(&json!({
            "address": address.to_string(),
            "stages": slots,
        })),
        (OutputFormat::Text, Lookup::Entry(Some(entry))) => {
            print_entry(entry);
            Ok(())
        }
        (OutputFormat::Text, Lookup::Entry(None)) => {
            println!("{} is not staged", address.to_string().yellow());
            Ok(())
        }
        (OutputFormat::Text, Lookup::Stages(slots)) => {
            for (stage, slot) in Stage::ALL.iter().zip(slots) {
                match slot {
                    Some(entry) => {
                        println!("{} {} {}", "stage".bold(), stage, staged_line(*stage, entry))
                    }
                    None => println!("{} {} {}", "stage".bold(), stage, "-".dimmed()),
                }
            }
            Ok(())
        }
    }
}

fn cmd_ls_files(
    config: &IndexConfig,
    args: LsFilesArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let persisted = open_index(config)?;
    let index = persisted.index();

    if args.stage {
        let entries: Vec<_> = index
            .entries()
            .filter(|(stage, _)| args.unmerged || !stage.is_conflict())
            .collect();
        return match format {
            OutputFormat::Json => print_json(&json!(entries
                .iter()
                .map(|(stage, entry)| json!({ "stage": stage, "entry": entry }))
                .collect::<Vec<_>>())),
            OutputFormat::Text => {
                for (stage, entry) in entries {
                    println!("{}", staged_line(stage, entry));
                }
                Ok(())
            }
        };
    }

    let files = index.list_files(args.unmerged);
    match format {
        OutputFormat::Json => print_json(&json!(files)),
        OutputFormat::Text => {
            for file in files {
                println!("{file}");
            }
            Ok(())
        }
    }
}

fn cmd_count(config: &IndexConfig, format: OutputFormat) -> anyhow::Result<()> {
    let persisted = open_index(config)?;
    let index = persisted.index();

    match format {
        OutputFormat::Json => print_json(&json!({
            "version": index.version().number(),
            "total": index.size(),
            "stages": Stage::ALL.map(|stage| index.stage_len(stage)),
            "conflicts": index.conflicted_oids(),
        })),
        OutputFormat::Text => {
            println!("Index version {}", index.version());
            for stage in Stage::ALL {
                println!("  stage {}: {}", stage, index.stage_len(stage));
            }
            println!("  total:   {}", index.size().to_string().bold());
            if index.has_conflicts() {
                println!(
                    "{} {} conflicted",
                    "!".red().bold(),
                    index.conflicted_oids().len()
                );
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------

/// What one `add` run left in the index.
#[derive(Debug, Default)]
struct AddReport {
    staged: Vec<IndexEntry>,
    /// `(previous, current)` names where a file displaced an entry with the
    /// same content.
    replaced: Vec<(String, String)>,
}

/// Stage every file under `paths` at stage 0, skipping the index file.
///
/// Entries are keyed by content, so a later file with the same bytes takes
/// over the earlier entry. The earlier name is reported as replaced and no
/// longer counted as staged.
fn stage_paths(
    index: &mut Index,
    root: &Path,
    paths: &[PathBuf],
    skip: Option<&Path>,
) -> anyhow::Result<AddReport> {
    let mut report = AddReport::default();
    for path in paths {
        for file in collect_files(path)? {
            if skip.is_some_and(|skip| fs::canonicalize(&file).is_ok_and(|file| file == skip)) {
                continue;
            }
            let entry = file_entry(&file, root)?;
            if let Some(previous) = index.entry(entry.oid()) {
                if previous.name() != entry.name() {
                    warn!(
                        previous = previous.name(),
                        name = entry.name(),
                        oid = %entry.oid(),
                        "identical content staged under a new name"
                    );
                    report
                        .replaced
                        .push((previous.name().to_string(), entry.name().to_string()));
                }
            }
            debug!(name = entry.name(), oid = %entry.oid(), "staging file");
            index.add(entry.clone())?;
            report.staged.retain(|staged| staged.oid() != entry.oid());
            report.staged.push(entry);
        }
    }
    Ok(report)
}

/// Directory staged names are relative to: the parent of the `.gitgo`
/// directory holding the index, otherwise the current directory.
fn work_root(index_path: &Path) -> anyhow::Result<PathBuf> {
    let root = index_path
        .parent()
        .filter(|dir| dir.file_name() == Some(OsStr::new(".gitgo")))
        .and_then(Path::parent)
        .filter(|root| !root.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::canonicalize(root).with_context(|| format!("resolving work tree {}", root.display()))
}

/// `path` itself if it is a file, otherwise every file beneath it.
fn collect_files(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let meta = fs::metadata(path).with_context(|| format!("reading {}", path.display()))?;
    if !meta.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_metadata_dir(entry));
    for entry in walker {
        let entry = entry.with_context(|| format!("walking {}", path.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_metadata_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && matches!(entry.file_name().to_str(), Some(".gitgo" | ".git"))
}

fn file_entry(path: &Path, root: &Path) -> anyhow::Result<IndexEntry> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let meta = fs::metadata(path).with_context(|| format!("reading {}", path.display()))?;
    let oid = ContentHasher::BLOB.hash(&data);
    Ok(IndexEntry::from_metadata(relative_name(path, root), oid, &meta))
}

/// Name of `path` relative to `root`, or its own components when it lies
/// outside.
fn relative_name(path: &Path, root: &Path) -> String {
    fs::canonicalize(path)
        .ok()
        .and_then(|full| full.strip_prefix(root).ok().map(index_name))
        .unwrap_or_else(|| index_name(path))
}

/// Slash-separated path name with `.` and root components dropped.
fn index_name(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            Component::ParentDir => Some("..".into()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn staged_line(stage: Stage, entry: &IndexEntry) -> String {
    format!(
        "{} {} {}\t{}",
        entry.mode(),
        entry.oid().to_string().yellow(),
        stage,
        entry.name()
    )
}

fn print_entry(entry: &IndexEntry) {
    println!("{} {}", "name:".bold(), entry.name());
    println!("{} {}", "oid: ".bold(), entry.oid().to_string().yellow());
    println!("{} {}", "type:".bold(), entry.entry_type());
    println!("{} {}", "mode:".bold(), entry.mode());
    println!("{} {}", "size:".bold(), entry.size());
    if !entry.flags().is_empty() {
        let flags: Vec<_> = entry.flags().iter().map(|flag| flag.as_str()).collect();
        println!("{} {}", "flags:".bold(), flags.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use gitgo_index::IndexVersion;

    fn run(index: &Path, args: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec!["gitgo", "--index", index.to_str().unwrap()];
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv)?)
    }

    fn reopen(index: &Path) -> PersistedIndex {
        PersistedIndex::from_config(&IndexConfig {
            path: index.to_path_buf(),
            ..IndexConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn init_creates_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("index");

        run(&index, &["--index-version", "4", "init"]).unwrap();
        assert!(index.exists());
        assert_eq!(reopen(&index).index().version(), IndexVersion::V4);

        assert!(run(&index, &["init"]).is_err());
        run(&index, &["init", "--force"]).unwrap();
        assert_eq!(reopen(&index).index().version(), IndexVersion::V3);
    }

    #[test]
    fn add_walks_directories_and_skips_metadata() {
        let work = tempfile::tempdir().unwrap();
        let root = work.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join(".gitgo")).unwrap();
        fs::write(root.join("src/a.txt"), "alpha").unwrap();
        fs::write(root.join("src/nested/b.txt"), "beta").unwrap();
        fs::write(root.join(".gitgo/ignored"), "meta").unwrap();
        let index = root.join(".gitgo/index");

        run(&index, &["add", root.to_str().unwrap()]).unwrap();

        let persisted = reopen(&index);
        let files: Vec<_> = persisted.index().list_files(false).into_iter().collect();
        assert_eq!(files, vec!["src/a.txt", "src/nested/b.txt"]);
        let alpha = ContentHasher::BLOB.hash(b"alpha");
        assert_eq!(persisted.index().entry(&alpha).unwrap().size(), 5);
    }

    #[test]
    fn add_reports_files_with_identical_content() {
        let work = tempfile::tempdir().unwrap();
        let root = work.path();
        fs::write(root.join("a.txt"), "same").unwrap();
        fs::write(root.join("b.txt"), "same").unwrap();
        fs::write(root.join("c.txt"), "other").unwrap();
        let index = root.join(".gitgo/index");

        run(&index, &["add", root.to_str().unwrap()]).unwrap();
        let files: Vec<_> = reopen(&index).index().list_files(false).into_iter().collect();
        assert_eq!(files, vec!["b.txt", "c.txt"]);

        let mut fresh = Index::from_version(IndexVersion::V3);
        let root = fs::canonicalize(root).unwrap();
        let report = stage_paths(&mut fresh, &root, &[root.clone()], None).unwrap();
        let staged: Vec<_> = report.staged.iter().map(|entry| entry.name()).collect();
        assert_eq!(staged, vec!["b.txt", "c.txt"]);
        assert_eq!(report.replaced, vec![("a.txt".to_string(), "b.txt".to_string())]);
        assert_eq!(fresh.size(), 2);
    }

    #[test]
    fn add_same_file_twice_is_not_a_replacement() {
        let work = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(work.path()).unwrap();
        let file = root.join("a.txt");
        fs::write(&file, "alpha").unwrap();

        let mut index = Index::new();
        let report = stage_paths(&mut index, &root, &[file.clone(), file], None).unwrap();
        assert!(report.replaced.is_empty());
        assert_eq!(report.staged.len(), 1);
        assert_eq!(report.staged[0].name(), "a.txt");
    }

    #[test]
    fn work_root_is_parent_of_metadata_dir() {
        let work = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(work.path()).unwrap();
        assert_eq!(work_root(&root.join(".gitgo/index")).unwrap(), root);
        assert_eq!(
            work_root(&root.join("index")).unwrap(),
            fs::canonicalize(".").unwrap()
        );
        assert_eq!(
            work_root(Path::new(".gitgo/index")).unwrap(),
            fs::canonicalize(".").unwrap()
        );

        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("docs/x.md"), "x").unwrap();
        assert_eq!(relative_name(&root.join("docs/x.md"), &root), "docs/x.md");
        let outside = tempfile::tempdir().unwrap();
        let stray = outside.path().join("y.md");
        fs::write(&stray, "y").unwrap();
        assert_eq!(relative_name(&stray, &root), index_name(&stray));
    }

    #[test]
    fn update_to_conflict_stage_then_resolve() {
        let work = tempfile::tempdir().unwrap();
        let file = work.path().join("f.txt");
        fs::write(&file, "ours").unwrap();
        let index = work.path().join("index");
        let file_arg = file.to_str().unwrap();

        run(&index, &["add", file_arg]).unwrap();
        let oid = ContentHasher::BLOB.hash(b"ours");
        assert_eq!(reopen(&index).index().stage_len(Stage::Clean), 1);

        run(&index, &["update", format!("2:{oid}").as_str(), file_arg]).unwrap();
        let persisted = reopen(&index);
        assert!(persisted.index().entry(&oid).is_none());
        assert!(persisted.index().stage_entry(Stage::Ours, &oid).is_some());
        assert_eq!(persisted.index().conflicted_oids(), vec![oid]);

        run(&index, &["update", oid.to_hex().as_str(), file_arg]).unwrap();
        let persisted = reopen(&index);
        assert!(!persisted.index().has_conflicts());
        assert!(persisted.index().entry(&oid).is_some());

        run(&index, &["rm", format!("*:{oid}").as_str()]).unwrap();
        assert!(reopen(&index).index().is_empty());
    }

    #[test]
    fn update_all_stages_is_rejected() {
        let work = tempfile::tempdir().unwrap();
        let file = work.path().join("f.txt");
        fs::write(&file, "x").unwrap();
        let index = work.path().join("index");
        let oid = ContentHasher::BLOB.hash(b"x");

        let err = run(
            &index,
            &["update", format!("*:{oid}").as_str(), file.to_str().unwrap()],
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("expected"));
        assert!(!index.exists());
    }

    #[test]
    fn read_commands_succeed_on_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("index");
        let oid = ContentHasher::BLOB.hash(b"none");

        run(&index, &["count"]).unwrap();
        run(&index, &["--format", "json", "ls-files", "--stage", "--unmerged"]).unwrap();
        run(&index, &["show", format!("*:{oid}").as_str()]).unwrap();
        assert!(run(&index, &["show", "3:nothex"]).is_err());
    }

    #[test]
    fn config_file_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("gitgo.toml");
        let index = dir.path().join("from-config");
        fs::write(
            &config,
            format!("version = 2\npath = {:?}\n", index.to_str().unwrap()),
        )
        .unwrap();

        let cli = Cli::try_parse_from(["gitgo", "--config", config.to_str().unwrap(), "init"])
            .unwrap();
        run_command(cli).unwrap();
        assert_eq!(reopen(&index).index().version(), IndexVersion::V2);

        let cli = Cli::try_parse_from([
            "gitgo",
            "--config",
            config.to_str().unwrap(),
            "--index-version",
            "9",
            "count",
        ])
        .unwrap();
        assert!(run_command(cli).is_err());
    }

    #[test]
    fn index_name_drops_curdir_and_root() {
        assert_eq!(index_name(Path::new("./src/a.rs")), "src/a.rs");
        assert_eq!(index_name(Path::new("/tmp/x/a.rs")), "tmp/x/a.rs");
        assert_eq!(index_name(Path::new("../up.txt")), "../up.txt");
    }
}
