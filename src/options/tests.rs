//! Tests for runtime options precedence and flag parsing.

use super::*;
use rstest::rstest;

fn meta_with_options(block: BddOptions) -> TestClassMeta {
    TestClassMeta {
        name: "com.example.CartTest".into(),
        tags: None,
        options: Some(block),
    }
}

fn props(pairs: &[(&str, &str)]) -> ConfigProperties {
    pairs.iter().copied().collect()
}

#[test]
fn class_options_win_over_property_options() {
    let meta = meta_with_options(BddOptions {
        tags: vec!["@smoke".into()],
        strict: true,
        ..BddOptions::default()
    });
    let config = props(&[(keys::OPTIONS, "--tags @nightly --dry-run")]);

    let options = load_runtime_options(&meta, &config).expect("options");

    assert_eq!(options.tags, vec!["@smoke"]);
    assert!(options.strict);
    assert!(!options.dry_run);
}

#[test]
fn classpath_prefixed_paths_are_stripped_from_class_options() {
    let meta = meta_with_options(BddOptions {
        glue: vec!["classpath:com.example.steps".into(), "src/steps".into()],
        features: vec!["classpath:features".into(), "a/b.feature".into()],
        ..BddOptions::default()
    });

    let options = load_runtime_options(&meta, &ConfigProperties::new()).expect("options");

    assert_eq!(options.glue, vec!["src/steps"]);
    assert_eq!(options.feature_paths, vec!["a/b.feature"]);
}

#[test]
fn property_options_split_on_whitespace_and_force_strict() {
    let meta = TestClassMeta::bare("com.example.CartTest");
    let config = props(&[(keys::OPTIONS, "--tags @wip --plugin pretty a/b.feature")]);

    let options = load_runtime_options(&meta, &config).expect("options");

    assert!(options.strict);
    assert_eq!(options.tags, vec!["@wip"]);
    assert_eq!(options.plugins, vec!["pretty"]);
    assert_eq!(options.feature_paths, vec!["a/b.feature"]);
}

#[rstest]
#[case(&[], true)]
#[case(&[("colors", "false")], true)]
#[case(&[("colors", "true")], false)]
fn default_options_derive_monochrome_from_colors(
    #[case] pairs: &[(&str, &str)],
    #[case] monochrome: bool,
) {
    let meta = TestClassMeta::bare("com.example.CartTest");
    let options = load_runtime_options(&meta, &props(pairs)).expect("options");

    assert!(options.strict);
    assert_eq!(options.plugins, vec!["pretty"]);
    assert_eq!(options.monochrome, monochrome);
}

#[rstest]
#[case("--tags", OptionsError::MissingValue { flag: "--tags".into() })]
#[case("--wat", OptionsError::UnknownFlag { flag: "--wat".into() })]
fn malformed_flag_sequences_are_rejected(#[case] sequence: &str, #[case] expected: OptionsError) {
    let meta = TestClassMeta::bare("com.example.CartTest");
    let config = props(&[(keys::OPTIONS, sequence)]);

    let err = load_runtime_options(&meta, &config).expect_err("should fail");
    assert_eq!(err.to_string(), expected.to_string());
}

#[test]
fn value_flags_never_consume_a_following_flag() {
    let err = RuntimeOptions::from_args(["--tags", "--strict"])
        .map(|_| ())
        .expect_err("should fail");

    assert_eq!(
        err.to_string(),
        OptionsError::MissingValue {
            flag: "--tags".into()
        }
        .to_string()
    );
}

#[test]
fn from_args_collects_value_flags_in_order() {
    let options = RuntimeOptions::from_args([
        "--plugin",
        "pretty",
        "--format",
        "json",
        "--glue",
        "steps",
        "--name",
        "checkout .*",
        "x.feature",
    ])
    .expect("options");

    assert_eq!(options.plugins, vec!["pretty", "json"]);
    assert_eq!(options.glue, vec!["steps"]);
    assert_eq!(options.names, vec!["checkout .*"]);
    assert_eq!(options.feature_paths, vec!["x.feature"]);
}
