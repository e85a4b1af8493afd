use esmfold::core::io::pdb::{PdbFile, PdbMetadata};
use esmfold::core::io::traits::StructureFile;
use esmfold::core::models::atom::Atom;
use esmfold::core::models::builder::StructureBuilder;
use esmfold::core::models::ids::ResidueId;
use esmfold::core::scores::{DuplicatePolicy, ScoreOptions, extract_scores};
use esmfold::core::sequence::Sequence;
use esmfold::engine::config::{EnvironmentConfig, PredictionConfigBuilder};
use esmfold::engine::environment::{InstallManifest, PackageSpec};
use esmfold::engine::error::EngineError;
use esmfold::engine::progress::{Progress, ProgressReporter};
use esmfold::engine::runner::{CommandRunner, ShellCommand};
use esmfold::workflows::{annotate, install, predict};
use nalgebra::Point3;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const TEST_SEQUENCE: &str = "LARKJLAKPABXZJUO********VAVAVALK";

/// Stands in for the inference script: parses the flags it would receive and
/// writes a CA-only PDB with one residue per sequence character.
#[derive(Default)]
struct FakeEsmFold {
    scripts: RefCell<Vec<String>>,
    write_output: bool,
    exit_code: Option<i32>,
}

impl FakeEsmFold {
    fn working() -> Self {
        Self {
            write_output: true,
            ..Default::default()
        }
    }
}

fn flag_value(tokens: &[String], flag: &str) -> String {
    let index = tokens
        .iter()
        .position(|t| t == flag)
        .unwrap_or_else(|| panic!("flag {flag} not passed"));
    tokens[index + 1].clone()
}

fn three_letter(code: char) -> &'static str {
    match code {
        'A' => "ALA",
        'K' => "LYS",
        'L' => "LEU",
        'P' => "PRO",
        'R' => "ARG",
        'V' => "VAL",
        'B' => "ASX",
        'Z' => "GLX",
        'U' => "SEC",
        'O' => "PYL",
        _ => "UNK",
    }
}

fn write_fake_prediction(sequence: &str, path: &Path) {
    let mut builder = StructureBuilder::new();
    builder.start_chain('A');
    for (i, code) in sequence.chars().enumerate() {
        builder
            .start_residue(i as isize + 1, None, three_letter(code))
            .unwrap();
        let mut atom = Atom::new(
            "CA",
            ResidueId::default(),
            Point3::new(3.8 * i as f64, 0.0, 0.0),
        );
        atom.serial = i + 1;
        atom.b_factor = 40.0 + (i % 13) as f64 * 3.5;
        builder.add_atom(atom).unwrap();
    }
    PdbFile::write_to_path(&builder.build(), &PdbMetadata::default(), path).unwrap();
}

impl CommandRunner for FakeEsmFold {
    fn run(&self, command: &ShellCommand) -> Result<(), EngineError> {
        self.scripts.borrow_mut().push(command.script.clone());
        if let Some(code) = self.exit_code {
            return Err(EngineError::CommandFailed {
                command: command.script.clone(),
                code: Some(code),
            });
        }
        if self.write_output && command.script.contains(" -od ") {
            let tokens: Vec<String> = command
                .script
                .split_whitespace()
                .map(|t| t.trim_matches('\'').to_string())
                .collect();
            let dir = PathBuf::from(flag_value(&tokens, "-od"));
            let name = flag_value(&tokens, "-o");
            let sequence = flag_value(&tokens, "-i");
            write_fake_prediction(&sequence, &dir.join(format!("{name}.pdb")));
        }
        Ok(())
    }
}

fn environment(home: &Path) -> EnvironmentConfig {
    EnvironmentConfig::new(home, &PackageSpec::ESM)
}

fn files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == extension))
        .collect()
}

#[test]
fn prediction_writes_raw_pdb_and_annotated_cif() {
    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("run");
    let env = environment(&dir.path().join("home"));
    let sequence = Sequence::new("test_seq", TEST_SEQUENCE).unwrap();
    let config = PredictionConfigBuilder::new()
        .chunk_size(64)
        .num_recycles(4)
        .build()
        .unwrap();
    let runner = FakeEsmFold::working();

    let output = predict::run(
        &sequence,
        &output_dir,
        &config,
        &env,
        &runner,
        &ProgressReporter::new(),
    )
    .unwrap();

    let scripts = runner.scripts.borrow();
    assert_eq!(scripts.len(), 1);
    assert!(scripts[0].contains("-m esmfold_v1 -g 0 -cs 64 -nr 4"));

    assert_eq!(output.pdb_path.file_name().unwrap(), "test_seq.pdb");
    assert!(fs::metadata(&output.pdb_path).unwrap().len() > 0);
    assert_eq!(files_with_extension(&output_dir, "pdb").len(), 1);
    assert_eq!(
        output.cif_path,
        output_dir.join("outputStructureESMFold.cif")
    );
    assert!(output.cif_path.is_file());

    assert_eq!(output.scores.len(), TEST_SEQUENCE.len());
    let cif = fs::read_to_string(&output.cif_path).unwrap();
    for number in 1..=TEST_SEQUENCE.len() {
        let rows = cif
            .lines()
            .filter(|line| line.starts_with(&format!("ESMFoldScore residues A:{number} ")))
            .count();
        assert_eq!(rows, 1, "residue A:{number} should have exactly one score row");
    }
}

#[test]
fn annotated_scores_match_the_raw_b_factors() {
    let dir = tempfile::tempdir().unwrap();
    let env = environment(&dir.path().join("home"));
    let sequence = Sequence::new("fidelity", TEST_SEQUENCE).unwrap();
    let config = PredictionConfigBuilder::new().build().unwrap();

    let output = predict::run(
        &sequence,
        dir.path(),
        &config,
        &env,
        &FakeEsmFold::working(),
        &ProgressReporter::new(),
    )
    .unwrap();

    let (raw, _) = PdbFile::read_from_path(&output.pdb_path).unwrap();
    for (_, residue, atom) in raw.atoms_in_order() {
        let key = format!("A:{}", residue.number);
        let scored = output
            .scores
            .iter()
            .find(|(k, _)| k.to_string() == key)
            .map(|(_, v)| v)
            .unwrap();
        assert_eq!(scored, atom.b_factor);
    }

    let reread = annotate::read_scores(&output.cif_path, DuplicatePolicy::Reject).unwrap();
    assert_eq!(reread, output.scores);
}

#[test]
fn repeated_annotation_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let pdb = dir.path().join("query.pdb");
    write_fake_prediction(TEST_SEQUENCE, &pdb);

    let (structure, _) = PdbFile::read_from_path(&pdb).unwrap();
    let first = extract_scores(&structure, &ScoreOptions::default()).unwrap();
    let second = extract_scores(&structure, &ScoreOptions::default()).unwrap();
    assert_eq!(first, second);

    let cif_a = dir.path().join("a.cif");
    let cif_b = dir.path().join("b.cif");
    annotate::run(&pdb, &cif_a, &ScoreOptions::default()).unwrap();
    annotate::run(&pdb, &cif_b, &ScoreOptions::default()).unwrap();
    assert_eq!(
        fs::read_to_string(cif_a).unwrap(),
        fs::read_to_string(cif_b).unwrap()
    );
}

#[test]
fn successful_run_without_output_is_missing_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let env = environment(&dir.path().join("home"));
    let sequence = Sequence::new("silent", "MKTAYIAK").unwrap();
    let config = PredictionConfigBuilder::new().build().unwrap();

    let err = predict::run(
        &sequence,
        dir.path(),
        &config,
        &env,
        &FakeEsmFold::default(),
        &ProgressReporter::new(),
    )
    .unwrap_err();

    match err {
        EngineError::MissingPrediction { path } => {
            assert_eq!(path.file_name().unwrap(), "silent.pdb");
        }
        other => panic!("expected MissingPrediction, got {other}"),
    }
    assert!(!dir.path().join("outputStructureESMFold.cif").exists());
}

#[test]
fn leftover_pdb_is_not_mistaken_for_a_new_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let env = environment(&dir.path().join("home"));
    let sequence = Sequence::new("rerun", "MKTAYIAK").unwrap();
    let config = PredictionConfigBuilder::new().build().unwrap();
    let stale = dir.path().join("rerun.pdb");
    write_fake_prediction("MKTAYIAK", &stale);

    let err = predict::run(
        &sequence,
        dir.path(),
        &config,
        &env,
        &FakeEsmFold::default(),
        &ProgressReporter::new(),
    )
    .unwrap_err();

    assert!(matches!(err, EngineError::MissingPrediction { ref path } if path.ends_with("rerun.pdb")));
    assert!(!stale.exists());
    assert!(!dir.path().join("outputStructureESMFold.cif").exists());
}

#[test]
fn failing_inference_is_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    let env = environment(&dir.path().join("home"));
    let sequence = Sequence::new("oom", "MKTAYIAK").unwrap();
    let config = PredictionConfigBuilder::new().build().unwrap();
    let runner = FakeEsmFold {
        exit_code: Some(1),
        ..Default::default()
    };

    let err = predict::run(
        &sequence,
        dir.path(),
        &config,
        &env,
        &runner,
        &ProgressReporter::new(),
    )
    .unwrap_err();

    assert!(matches!(err, EngineError::CommandFailed { code: Some(1), .. }));
}

#[test]
fn install_then_predict_reports_progress() {
    let dir = tempfile::tempdir().unwrap();
    let env = environment(&dir.path().join("esm-2.0.0"));
    let runner = FakeEsmFold::working();
    let phases = Mutex::new(Vec::new());
    let reporter = ProgressReporter::with_callback(Box::new(|event| {
        if let Progress::PhaseStart { name } = event {
            phases.lock().unwrap().push(name);
        }
    }));

    install::run(
        &InstallManifest::embedded().unwrap(),
        &env,
        &runner,
        &install::InstallOptions::default(),
        &reporter,
    )
    .unwrap();
    assert!(env.script_path.is_file());

    let sequence = Sequence::new("after_install", "MKTAYIAK").unwrap();
    let config = PredictionConfigBuilder::new().build().unwrap();
    predict::run(
        &sequence,
        &dir.path().join("out"),
        &config,
        &env,
        &runner,
        &reporter,
    )
    .unwrap();

    drop(reporter);
    assert_eq!(
        phases.into_inner().unwrap(),
        vec!["Installation", "Inference", "Annotation"]
    );
}
