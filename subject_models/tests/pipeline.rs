use std::{fs, num::NonZeroUsize, path::Path};

use rand::{SeedableRng, rngs::StdRng};
use subject_models::{
    RunConfig, SubjectErr,
    cli::Args,
    device::Device,
    functions::FnName,
    persistence::{ArtifactStore, metadata_path, model_path},
    pipeline::{self, draw_parameters},
};

use clap::Parser;

fn small_config(path: &Path, fn_name: FnName, count: usize, seed: u64) -> RunConfig {
    let mut config = RunConfig::new(path, fn_name, seed, 20);
    config.count = NonZeroUsize::new(count).unwrap();
    config.batch_size = NonZeroUsize::new(64).unwrap();
    config.batch_count = NonZeroUsize::new(4).unwrap();
    config
}

fn files_in(path: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(path)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn saves_a_parameter_and_metadata_file_per_network() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config(dir.path(), FnName::Addition, 2, 0);

    let report = pipeline::run(&config).unwrap();

    assert_eq!(report.ids.len(), 2);
    assert_eq!(files_in(dir.path()).len(), 4);

    let expected = draw_parameters(&mut StdRng::seed_from_u64(0), 2);
    for (id, (metadata, parameter)) in report.ids.iter().zip(report.metadata.iter().zip(expected)) {
        assert!(model_path(dir.path(), id).is_file());
        assert!(metadata_path(dir.path(), id).is_file());

        assert_eq!(metadata.fn_name, FnName::Addition);
        assert_eq!(metadata.parameter, parameter);
        assert_eq!(metadata.seed, 0);
        assert_eq!(metadata.epochs, 20);
        assert!(metadata.loss.is_finite() && metadata.loss >= 0.);
    }
}

#[test]
fn metadata_matches_the_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = small_config(dir.path(), FnName::Exponent, 4, 17);
    config.weight_decay = 0.001;
    config.epochs = 2;

    let report = pipeline::run(&config).unwrap();
    assert_eq!(files_in(dir.path()).len(), 8);

    let store = ArtifactStore::open(dir.path()).unwrap();
    for (id, metadata) in report.ids.iter().zip(&report.metadata) {
        let (net, stored) = store.load(id).unwrap();

        assert_eq!(&stored, metadata);
        assert_eq!(stored.fn_name, FnName::Exponent);
        assert_eq!(stored.weight_decay, 0.001);
        assert_eq!(stored.epochs, 2);
        assert_eq!(stored.seed, 17);
        assert_eq!(net.size(), 726);
    }
}

#[test]
fn same_seed_same_networks() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    let a = pipeline::run(&small_config(first.path(), FnName::Min, 2, 5)).unwrap();

    let mut config = small_config(second.path(), FnName::Min, 2, 5);
    config.device = Device::CpuParallel { threads: 2 };
    let b = pipeline::run(&config).unwrap();

    assert_eq!(a.metadata, b.metadata);

    let first = ArtifactStore::open(first.path()).unwrap();
    let second = ArtifactStore::open(second.path()).unwrap();
    for (x, y) in a.ids.iter().zip(&b.ids) {
        let (x, _) = first.load(x).unwrap();
        let (y, _) = second.load(y).unwrap();
        assert_eq!(x.params(), y.params());
    }
}

#[test]
fn unknown_function_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("subjects");

    let args = Args::try_parse_from([
        "train_subject_models",
        "--path",
        out.to_str().unwrap(),
        "--seed",
        "0",
        "--fn_name",
        "division",
        "--epochs",
        "1",
    ])
    .unwrap();

    let result = args.into_config();

    assert!(matches!(result, Err(SubjectErr::InvalidFnName(name)) if name == "division"));
    assert!(!out.exists());
}
