use super::*;
use secrecy::ExposeSecret;

#[test]
fn test_empty_file_uses_defaults() {
    let settings = Settings::from_toml("").unwrap();
    assert_eq!(settings.services.poll_seconds, 900);
    assert_eq!(settings.services.api_key_env, "NGC_CLI_API_KEY");
    assert_eq!(settings.services.probe_timeout_seconds, 10);
    assert_eq!(settings.design.header_marker, ">T=");
    assert!(settings.design.use_soluble_model);
    assert!(!settings.validation.enabled);
    assert_eq!(settings.validation.selected_models, vec![1]);
    assert_eq!(settings.output.layout, OutputLayoutPolicy::CycleScoped);
}

#[test]
fn test_default_endpoints() {
    let services = ServicesConfig::default();
    let gen = services.endpoint(Stage::StructureGeneration);
    assert_eq!(gen.url(), "http://localhost:8082/biology/ipd/rfdiffusion/generate");
    let design = services.endpoint(Stage::SequenceDesign);
    assert_eq!(design.port, 8083);
    assert_eq!(design.health_url(), "http://localhost:8083/v1/health/ready");
    assert_eq!(services.endpoint(Stage::StructureValidation).port, 8084);
}

#[test]
fn test_regions_and_overrides_parse() {
    let toml = r#"
        [services]
        host = "http://10.0.0.5"
        poll_seconds = 300

        [services.sequence_design]
        port = 9083
        path = "custom/predict"

        [output]
        root = "/tmp/bench"
        layout = "num_seq_scoped"

        [design]
        chain_selectors = ["A"]

        [[regions]]
        label = "1A"
        target_sequence = "MDPPRPALL"
        region_spec = "A400-440/0 15-25"
        structure_path = "cycle1_alphafold2_output.pdb"
    "#;
    let settings = Settings::from_toml(toml).unwrap();
    assert_eq!(settings.services.endpoint(Stage::SequenceDesign).url(), "http://10.0.0.5:9083/custom/predict");
    assert_eq!(settings.services.endpoint(Stage::StructureGeneration).poll_seconds, 300);
    assert_eq!(settings.output.layout, OutputLayoutPolicy::NumSeqScoped);
    assert_eq!(settings.design.chain_selectors, vec!["A".to_string()]);

    let catalog = settings.region_catalog().unwrap();
    assert_eq!(catalog.resolve("1A").unwrap().region_spec, "A400-440/0 15-25");
}

#[test]
fn test_empty_selected_models_rejected() {
    let toml = "[validation]\nselected_models = []\n";
    assert!(matches!(Settings::from_toml(toml), Err(BinderError::Config(_))));
}

#[test]
fn test_missing_file_is_config_error() {
    let err = Settings::load_from("/definitely/not/here/binderflow.toml").unwrap_err();
    assert!(matches!(err, BinderError::Config(_)));
}

#[test]
fn test_api_key_from_env() {
    let mut services = ServicesConfig::default();
    services.api_key_env = "BINDERFLOW_TEST_KEY_PRESENT".to_string();
    std::env::set_var("BINDERFLOW_TEST_KEY_PRESENT", "nvapi-123");
    let key = services.api_key().unwrap();
    assert_eq!(key.expose_secret(), "nvapi-123");
}

#[test]
fn test_missing_api_key_is_fatal() {
    let mut services = ServicesConfig::default();
    services.api_key_env = "BINDERFLOW_TEST_KEY_ABSENT".to_string();
    std::env::remove_var("BINDERFLOW_TEST_KEY_ABSENT");
    let err = services.api_key().unwrap_err();
    assert!(err.is_preflight());
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("binderflow.toml");
    std::fs::write(&path, "[validation]\nenabled = true\nmax_pairs = 0\n").unwrap();
    let settings = Settings::load_from(&path).unwrap();
    assert!(settings.validation.enabled);
    assert_eq!(settings.validation.max_pairs, 0);
}

#[test]
fn test_example_config_parses() {
    let settings = Settings::from_toml(include_str!("../../../../binderflow.example.toml")).unwrap();
    let catalog = settings.region_catalog().unwrap();
    assert_eq!(catalog.len(), 10);
    assert_eq!(catalog.resolve("1B").unwrap().region_spec, "A450-490/0 15-25");
    assert_eq!(
        catalog.resolve("2").unwrap().structure_path,
        PathBuf::from("cycle2_alphafold2_output.pdb")
    );
    assert_eq!(settings.services.endpoint(Stage::SequenceDesign).port, 8083);
}
