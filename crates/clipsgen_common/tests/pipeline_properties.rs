//! Pipeline property tests
//!
//! Exercises the stages together with the fake model client and fake rule
//! engine:
//! - execution isolation between programs
//! - idempotence of repeated execution
//! - the adult classification scenario end to end
//! - the firing ceiling
//!
//! The `real_clips_*` tests need a `clips` binary on PATH and are ignored
//! by default.

use clipsgen_common::engine::{FakeProgram, FakeRuleEngine};
use clipsgen_common::model_client::FakeModelClient;
use clipsgen_common::{
    ClipsProcessEngine, ExecutionLimits, ExecutionResult, Executor, GenerationConfig,
    GeneratedSource, Generator, InterpretationConfig, Interpreter, ProblemStatement,
};
use std::sync::Arc;
use std::time::Duration;

const ADULT_PROGRAM: &str = r#"(deftemplate person (slot name) (slot age))
(deftemplate adult (slot name))
(deffacts people (person (name "John") (age 20)))
(defrule classify-adult
   (person (name ?n) (age ?a&:(>= ?a 18)))
   =>
   (assert (adult (name ?n)))
   (printout t ?n " is an adult" crlf))"#;

const LOOP_PROGRAM: &str = r#"(deftemplate counter (slot n))
(deffacts start (counter (n 0)))
(defrule spin
   ?c <- (counter (n ?n))
   =>
   (retract ?c)
   (assert (counter (n (+ ?n 1)))))"#;

fn adult_engine() -> FakeRuleEngine {
    FakeRuleEngine::new()
        .with_program(
            ADULT_PROGRAM,
            FakeProgram::fires(1)
                .initial_fact("(person (name \"John\") (age 20))")
                .derived_fact("(adult (name \"John\"))")
                .prints("John is an adult"),
        )
        .with_program(
            "(deffacts other (weather sunny))",
            FakeProgram::fires(0).initial_fact("(weather sunny)"),
        )
}

fn model_reply(source: &str) -> String {
    format!(
        "Here is a CLIPS program for your problem:\n\n```clips\n{}\n```\n\nIt classifies adults.",
        source
    )
}

#[tokio::test]
async fn execution_is_isolated_between_programs() {
    let engine = adult_engine();
    let executor = Executor::new(Arc::new(engine.clone()), ExecutionLimits::default());

    let a = GeneratedSource::new(ADULT_PROGRAM);
    let b = GeneratedSource::new("(deffacts other (weather sunny))");

    let _ = executor.execute(&a).await;
    let b_after_a = executor.execute(&b).await;

    let fresh = Executor::new(Arc::new(adult_engine()), ExecutionLimits::default());
    let b_alone = fresh.execute(&b).await;

    assert_eq!(b_after_a, b_alone);
    assert_eq!(
        b_alone,
        ExecutionResult::Success {
            rules_fired: 0,
            facts: vec!["(weather sunny)".to_string()],
            output: vec![],
        }
    );
    assert_eq!(engine.environments_created(), 2);
}

#[tokio::test]
async fn repeated_execution_is_idempotent() {
    let executor = Executor::new(Arc::new(adult_engine()), ExecutionLimits::default());
    let source = GeneratedSource::new(ADULT_PROGRAM);

    let first = executor.execute(&source).await;
    for _ in 0..3 {
        assert_eq!(executor.execute(&source).await, first);
    }
}

#[tokio::test]
async fn result_has_exactly_one_variant() {
    let executor = Executor::new(Arc::new(adult_engine()), ExecutionLimits::default());
    for source in [ADULT_PROGRAM, "", "(unknown"] {
        match executor.execute(&GeneratedSource::new(source)).await {
            ExecutionResult::Success { .. } => assert_eq!(source, ADULT_PROGRAM),
            ExecutionResult::Failure { message } => {
                assert!(message.starts_with("Execution error: "))
            }
        }
    }
}

#[tokio::test]
async fn adult_classification_end_to_end() {
    let client = Arc::new(FakeModelClient::new(vec![
        Ok(model_reply(ADULT_PROGRAM)),
        Ok("John is 20, so he is classified as an adult.".to_string()),
    ]));
    let generator = Generator::new(
        client.clone(),
        GenerationConfig {
            model: "codellama".to_string(),
            template: "{problem}".to_string(),
        },
    );
    let executor = Executor::new(Arc::new(adult_engine()), ExecutionLimits::default());
    let interpreter = Interpreter::new(
        client.clone(),
        InterpretationConfig {
            model: "codellama".to_string(),
            template: "{problem}\n{output}".to_string(),
        },
    );

    let problem = ProblemStatement::new("Classify if a person is adult based on age >= 18");
    let source = generator.generate(&problem).await.unwrap();
    assert_eq!(source.as_str(), ADULT_PROGRAM);

    let result = executor.execute(&source).await;
    match &result {
        ExecutionResult::Success {
            rules_fired, facts, ..
        } => {
            assert_eq!(*rules_fired, 1);
            assert!(facts.iter().any(|f| f.contains("adult")));
        }
        other => panic!("expected success, got {other:?}"),
    }

    let interp = interpreter.interpret(&problem, &result).await;
    assert!(!interp.degraded);
    assert!(interp.text.contains("adult"));
    assert_eq!(client.call_count(), 2);
    assert!(client.calls()[1].messages[0].content.contains("Rules fired: 1"));
}

#[tokio::test]
async fn runaway_program_hits_firing_ceiling() {
    let engine = FakeRuleEngine::new().with_program(LOOP_PROGRAM, FakeProgram::fires(1_000_000));
    let executor = Executor::new(
        Arc::new(engine),
        ExecutionLimits {
            max_rule_firings: Some(1000),
        },
    );

    let result = executor.execute(&GeneratedSource::new(LOOP_PROGRAM)).await;
    match result {
        ExecutionResult::Failure { message } => {
            assert!(message.contains("rule firing limit of 1000"), "{message}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

fn real_engine() -> ClipsProcessEngine {
    ClipsProcessEngine::new("clips", Duration::from_secs(10))
}

#[tokio::test]
#[ignore] // Requires the clips binary
async fn real_clips_adult_program() {
    let executor = Executor::new(Arc::new(real_engine()), ExecutionLimits::default());
    let result = executor.execute(&GeneratedSource::new(ADULT_PROGRAM)).await;
    match result {
        ExecutionResult::Success {
            rules_fired,
            facts,
            output,
        } => {
            assert_eq!(rules_fired, 1);
            assert!(facts.iter().any(|f| f.starts_with("(adult")));
            assert_eq!(output, vec!["John is an adult"]);
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
#[ignore] // Requires the clips binary
async fn real_clips_syntax_error() {
    let executor = Executor::new(Arc::new(real_engine()), ExecutionLimits::default());
    let result = executor
        .execute(&GeneratedSource::new("(defrule broken (a) => (assert (b))"))
        .await;
    assert!(!result.is_success());
}

#[tokio::test]
#[ignore] // Requires the clips binary
async fn real_clips_runaway_program_is_bounded() {
    let executor = Executor::new(
        Arc::new(real_engine()),
        ExecutionLimits {
            max_rule_firings: Some(500),
        },
    );
    let result = executor.execute(&GeneratedSource::new(LOOP_PROGRAM)).await;
    match result {
        ExecutionResult::Failure { message } => {
            assert!(message.contains("rule firing limit of 500"), "{message}")
        }
        other => panic!("expected failure, got {other:?}"),
    }
}
