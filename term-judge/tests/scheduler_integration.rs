//! Integration tests for the scheduler across execution strategies.

use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use term_judge::core::{ExecAffinity, ResultCategory, DUMMY_LIBRARY};
use term_judge::prelude::*;

fn worker_options() -> SchedulerOptions {
    SchedulerOptions::default().with_worker_program(env!("CARGO_BIN_EXE_term-judge-worker"))
}

/// Creates a store directory with a few small CSV files.
fn create_csv_store() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("orders.csv"),
        "id,customer,amount\n1,ada,10.5\n2,alan,20\n3,grace,-4\n4,ada,\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("customers.csv"),
        "name,country,active\nada,uk,true\nalan,uk,false\ngrace,us,true\n",
    )
    .unwrap();
    for i in 0..6 {
        fs::write(
            dir.path().join(format!("part_{i}.csv")),
            format!("col_{i},value\n{i},x\n"),
        )
        .unwrap();
    }
    dir
}

fn local_store(dir: &Path) -> Vec<StoreConfig> {
    vec![StoreConfig::local("local", dir).with_default(true)]
}

fn datafusion_config() -> RunConfig {
    RunConfig::default()
        .with_inference(ExecConfig::new("datafusion"))
        .with_validation(ExecConfig::new("datafusion"))
        .with_profiling(ExecConfig::new("datafusion"))
}

fn sql_constraint(name: &str, resource: &str, query: &str, check: &str, expect: &str) -> Constraint {
    Constraint::new(name, "datafusion", [resource])
        .with_field("query", query)
        .with_field("check", check)
        .with_field("expect", expect)
}

#[test]
fn test_dummy_validation_one_entry_per_category() {
    let mut handler = RunHandler::new(
        RunConfig::default(),
        vec![StoreConfig::local("local", "/data")],
    );
    let resources = vec![
        DataResource::new("A", "a.csv", "local"),
        DataResource::new("C", "c.csv", "local"),
    ];
    let constraints = vec![Constraint::new("c1", DUMMY_LIBRARY, ["A", "B"])];

    handler
        .validate(&resources, &constraints, "partial", true, 2)
        .unwrap();

    for category in ResultCategory::ALL {
        assert_eq!(
            handler.results().len(Operation::Validation, category),
            1,
            "category {category:?}"
        );
    }
    let report = handler.judge_reports()[0].unwrap();
    assert_eq!(report.as_validation().unwrap().valid, None);
}

#[test]
fn test_mixed_inference_over_process_pool() {
    let dir = create_csv_store();
    let resources = vec![
        DataResource::new("orders", "orders.csv", "local"),
        DataResource::new("ghost", "ghost.csv", "local"),
    ];

    let mut handler = RunHandler::new(datafusion_config(), local_store(dir.path()))
        .with_options(worker_options());
    handler.infer(&resources, true, 2).unwrap();

    let artifacts = handler.artifact_schemas();
    assert_eq!(artifacts.len(), 2);
    assert_eq!(artifacts[0].unwrap()["resource"], json!("orders"));
    assert!(artifacts[1].is_none());

    let wrapped = handler.results().wrapped(Operation::Inference);
    assert_eq!(wrapped[0].status, ExecStatus::Finished);
    assert_eq!(wrapped[1].status, ExecStatus::Error);

    let rendered = handler.rendered_schemas();
    assert_eq!(rendered.len(), 2);
    assert_eq!(rendered[0].filename, "schema_datafusion.json");
    assert!(rendered[1].object.get("errors").is_some());

    let schema = handler.judge_schemas()[0].unwrap().as_schema().unwrap();
    let names: Vec<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["id", "customer", "amount"]);
}

#[test]
fn test_misconfigured_inference_backend_over_process_pool() {
    let dir = create_csv_store();
    let resources = vec![DataResource::new("orders", "orders.csv", "local")];
    let config = RunConfig::default()
        .with_inference(ExecConfig::new("datafusion"))
        .with_inference(ExecConfig::new("datafusion").with_arg("file_format", "xlsx"));

    let mut handler = RunHandler::new(config, local_store(dir.path())).with_options(worker_options());
    handler.infer(&resources, true, 2).unwrap();

    let wrapped = handler.results().wrapped(Operation::Inference);
    assert_eq!(wrapped.len(), 2);
    assert_eq!(wrapped[0].status, ExecStatus::Finished);
    assert_eq!(wrapped[1].status, ExecStatus::Error);
    assert!(wrapped[1].error_message().unwrap().contains("xlsx"));

    for category in ResultCategory::ALL {
        assert_eq!(
            handler.results().len(Operation::Inference, category),
            2,
            "category {category:?}"
        );
    }

    let artifacts = handler.artifact_schemas();
    assert_eq!(artifacts[0].unwrap()["resource"], json!("orders"));
    assert!(artifacts[1].is_none());
    assert_eq!(handler.results().libraries(Operation::Inference).len(), 2);
    assert_eq!(handler.libraries()[&Operation::Inference].len(), 1);
}

#[test]
fn test_process_pool_matches_sequential_order() {
    let dir = create_csv_store();
    let resources: Vec<DataResource> = (0..6)
        .map(|i| DataResource::new(format!("part_{i}"), format!("part_{i}.csv"), "local"))
        .collect();

    let mut sequential = RunHandler::new(datafusion_config(), local_store(dir.path()));
    sequential.infer(&resources, false, 1).unwrap();

    let mut pooled = RunHandler::new(datafusion_config(), local_store(dir.path()))
        .with_options(worker_options());
    pooled.infer(&resources, true, 3).unwrap();

    let first_columns = |handler: &RunHandler| -> Vec<String> {
        handler
            .judge_schemas()
            .into_iter()
            .map(|report| report.unwrap().as_schema().unwrap().fields[0].name.clone())
            .collect()
    };
    let expected: Vec<String> = (0..6).map(|i| format!("col_{i}")).collect();
    assert_eq!(first_columns(&sequential), expected);
    assert_eq!(first_columns(&pooled), expected);
}

#[test]
fn test_thread_pool_validation_matches_sequential_order() {
    let dir = create_csv_store();
    let resources = vec![
        DataResource::new("orders", "orders.csv", "local"),
        DataResource::new("customers", "customers.csv", "local"),
    ];
    let constraints = vec![
        sql_constraint("no_negative", "orders", "SELECT COUNT(*) FROM orders WHERE amount < 0", "value", "exact")
            .with_field("value", 0),
        sql_constraint("has_customers", "customers", "SELECT * FROM customers", "rows", "non-empty"),
        sql_constraint("uk_customers", "customers", "SELECT * FROM customers WHERE country = 'uk'", "rows", "range")
            .with_field("value", "[1, 3)"),
        sql_constraint("max_amount", "orders", "SELECT MAX(amount) FROM orders", "value", "maximum")
            .with_field("value", 25),
    ];

    let outcome = |parallel: bool| -> Vec<(String, Option<bool>)> {
        let mut handler = RunHandler::new(datafusion_config(), local_store(dir.path()));
        handler
            .validate(&resources, &constraints, "full", parallel, 4)
            .unwrap();
        handler
            .judge_reports()
            .into_iter()
            .map(|report| {
                let validation = report.unwrap().as_validation().unwrap();
                let name = validation.constraint.as_ref().unwrap()["name"]
                    .as_str()
                    .unwrap()
                    .to_string();
                (name, validation.valid)
            })
            .collect()
    };

    let sequential = outcome(false);
    assert_eq!(
        sequential,
        vec![
            ("no_negative".to_string(), Some(false)),
            ("has_customers".to_string(), Some(true)),
            ("uk_customers".to_string(), Some(true)),
            ("max_amount".to_string(), Some(true)),
        ]
    );
    assert_eq!(outcome(true), sequential);
}

#[test]
fn test_error_report_modes_shape_records() {
    let dir = create_csv_store();
    let resources = vec![DataResource::new("orders", "orders.csv", "local")];
    let constraints = vec![sql_constraint(
        "no_negative",
        "orders",
        "SELECT COUNT(*) FROM orders WHERE amount < 0",
        "value",
        "exact",
    )
    .with_field("value", 0)];

    for (mode, expected_records) in [("count", 0), ("partial", 1), ("full", 1)] {
        let mut handler = RunHandler::new(datafusion_config(), local_store(dir.path()));
        handler
            .validate(&resources, &constraints, mode, false, 1)
            .unwrap();

        let report = handler.judge_reports()[0].unwrap();
        let errors = report.as_validation().unwrap().errors.as_ref().unwrap();
        assert_eq!(errors.count, 1, "mode {mode}");
        assert_eq!(errors.records.len(), expected_records, "mode {mode}");
    }
}

#[test]
fn test_profiling_runs_on_threads() {
    let dir = create_csv_store();
    let resources = vec![
        DataResource::new("orders", "orders.csv", "local"),
        DataResource::new("customers", "customers.csv", "local"),
    ];

    let mut handler = RunHandler::new(datafusion_config(), local_store(dir.path()));
    handler.profile(&resources, true, 2).unwrap();

    let profiles = handler.judge_profiles();
    assert_eq!(profiles.len(), 2);
    let orders = profiles[0].unwrap().as_profile().unwrap();
    assert_eq!(orders.stats["rows"], json!(4));
    assert_eq!(orders.fields["amount"]["missing"], json!(1));
    let customers = profiles[1].unwrap().as_profile().unwrap();
    assert_eq!(customers.fields["country"]["distinct"], json!(2));

    let libraries = handler.libraries();
    assert_eq!(libraries[&Operation::Profiling].len(), 1);
    assert_eq!(libraries[&Operation::Profiling][0].library_name, "datafusion");
}

#[test]
fn test_unknown_backend_rejected() {
    let config = RunConfig::default().with_profiling(ExecConfig::new("great_expectations"));
    let mut handler = RunHandler::new(config, vec![StoreConfig::local("local", "/data")]);
    let resources = vec![DataResource::new("a", "a.csv", "local")];

    let err = handler.profile(&resources, false, 1).unwrap_err();
    assert!(matches!(
        err,
        JudgeError::UnknownBackend { operation: Operation::Profiling, ref library } if library == "great_expectations"
    ));
    assert!(handler.results().is_empty());
}

#[test]
fn test_invalid_error_report_rejected() {
    let mut handler = RunHandler::new(RunConfig::default(), vec![]);
    let err = handler.validate(&[], &[], "some", false, 1).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_missing_store_fails_before_execution() {
    let dir = create_csv_store();
    let mut handler = RunHandler::new(datafusion_config(), local_store(dir.path()));
    let resources = vec![
        DataResource::new("orders", "orders.csv", "local"),
        DataResource::new("remote", "remote.csv", "warehouse"),
    ];

    let err = handler.infer(&resources, false, 1).unwrap_err();
    assert!(matches!(err, JudgeError::StoreNotFound { ref store, .. } if store == "warehouse"));
    assert!(handler.artifact_schemas().is_empty());

    // Other operations of the same handler still run.
    handler.profile(&resources[..1], false, 1).unwrap();
    assert_eq!(handler.artifact_profiles().len(), 1);
}

#[test]
fn test_disabled_backend_falls_back_to_dummy() {
    let config = RunConfig::default()
        .with_inference(ExecConfig::new("datafusion").with_enabled(false));
    let mut handler = RunHandler::new(config, vec![StoreConfig::local("local", "/data")]);
    let resources = vec![DataResource::new("a", "a.csv", "local")];

    handler.infer(&resources, false, 1).unwrap();
    assert_eq!(handler.libraries()[&Operation::Inference][0].library_name, DUMMY_LIBRARY);
}

#[test]
fn test_plugin_affinities() {
    let dir = create_csv_store();
    let stores = local_store(dir.path());
    let resources = vec![DataResource::new("orders", "orders.csv", "local")];
    let request = term_judge::plugins::BuildRequest::new(&resources);

    let registry = BuilderRegistry::with_defaults();
    let affinity = |operation: Operation| {
        let config = ExecConfig::new("datafusion");
        let mut builder = registry
            .create_builder(operation, &config, &stores)
            .unwrap();
        let plugins = builder.build(&request).unwrap();
        builder.destroy().unwrap();
        plugins[0].affinity()
    };

    assert_eq!(affinity(Operation::Inference), ExecAffinity::Process);
    assert_eq!(affinity(Operation::Profiling), ExecAffinity::Thread);
}
