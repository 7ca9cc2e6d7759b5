//! End-to-end lifecycle scenarios: chained commands sharing output params,
//! pre/post extensions mutating command state, validation failures.

use serde_yml::Value;

use conveyor::{
    CommandExtension, CommandRunner, ExecutionCommand, ExecutionContext, Outcome, Result,
};

struct SumIntegersCommand {
    context: ExecutionContext,
    param_1: i64,
    param_2: i64,
}

impl SumIntegersCommand {
    fn new(context: ExecutionContext) -> Self {
        Self {
            context,
            param_1: 0,
            param_2: 0,
        }
    }
}

impl ExecutionCommand for SumIntegersCommand {
    fn name(&self) -> &str {
        "sum-integers"
    }

    fn context(&self) -> &ExecutionContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }

    fn validate(&mut self) -> Result<bool> {
        let names = [
            "paths.input.params",
            "paths.output.params",
            "params.param_1",
            "params.param_2",
        ];
        if !self.context.validate(&names) {
            return Ok(false);
        }
        self.param_1 = self.context.input_i64("params.param_1")?.unwrap_or(0);
        self.param_2 = self.context.input_i64("params.param_2")?.unwrap_or(0);
        Ok(true)
    }

    fn execute(&mut self) -> Result<Outcome> {
        self.context
            .logger()
            .info("Running sum-integers - calculating sum of 'param_1' and 'param_2'...");
        let result = self.param_1 + self.param_2;
        self.context.output_param_set("params.result", Value::from(result));
        self.context.output_params_save()?;
        Ok(Outcome::Done)
    }
}

struct AddTenToParam1;

impl CommandExtension<SumIntegersCommand> for AddTenToParam1 {
    fn execute(&mut self, command: &mut SumIntegersCommand) -> Result<Outcome> {
        command.param_1 += 10;
        Ok(Outcome::Done)
    }
}

struct OverrideResult;

impl CommandExtension<SumIntegersCommand> for OverrideResult {
    fn execute(&mut self, command: &mut SumIntegersCommand) -> Result<Outcome> {
        command
            .context_mut()
            .output_param_set("params.result", Value::from(12345));
        command.context().output_params_save()?;
        Ok(Outcome::Done)
    }
}

fn params(yaml: &str) -> Value {
    serde_yml::from_str(yaml).unwrap()
}

fn sum_command(dir: &std::path::Path, param_1: i64, param_2: i64) -> SumIntegersCommand {
    let context = ExecutionContext::ephemeral(
        Some(dir),
        Some(params(&format!(
            "params:\n  param_1: '{}'\n  param_2: '{}'\n",
            param_1, param_2
        ))),
        None,
    )
    .unwrap();
    SumIntegersCommand::new(context)
}

fn saved_result(dir: &std::path::Path) -> i64 {
    let saved = conveyor::ContextFile::load(&dir.join("output/params.yaml"));
    saved
        .get("params.result")
        .and_then(Value::as_i64)
        .expect("params.result in output artifact")
}

#[test]
fn chained_commands_pass_results_through_output_params() {
    let first_dir = tempfile::tempdir().unwrap();
    let mut first = CommandRunner::new(sum_command(first_dir.path(), 9, 10));
    assert_eq!(first.run(), 0);

    let intermediate = first
        .command()
        .context()
        .output_param_get("params.result")
        .and_then(Value::as_i64)
        .unwrap();
    assert_eq!(intermediate, 19);

    let second_dir = tempfile::tempdir().unwrap();
    let mut second = CommandRunner::new(sum_command(second_dir.path(), intermediate, 1));
    assert_eq!(second.run(), 0);

    assert_eq!(saved_result(second_dir.path()), 20);
}

#[test]
fn three_pre_extensions_compose_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = CommandRunner::new(sum_command(dir.path(), 5, 6))
        .with_pre_action(Box::new(AddTenToParam1))
        .with_pre_action(Box::new(AddTenToParam1))
        .with_pre_action(Box::new(AddTenToParam1));

    assert_eq!(runner.run(), 0);
    assert_eq!(saved_result(dir.path()), 41);
}

#[test]
fn post_extension_overrides_the_persisted_result() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner =
        CommandRunner::new(sum_command(dir.path(), 5, 6)).with_post_action(Box::new(OverrideResult));

    assert_eq!(runner.run(), 0);
    assert_eq!(saved_result(dir.path()), 12345);
}

#[test]
fn missing_params_fail_validation_without_executing() {
    let dir = tempfile::tempdir().unwrap();
    let context = ExecutionContext::ephemeral(Some(dir.path()), None, None).unwrap();
    let mut runner = CommandRunner::new(SumIntegersCommand::new(context));

    assert_eq!(runner.run(), 1);
    assert!(!dir.path().join("output/params.yaml").exists());
}

#[test]
fn secure_params_are_visible_to_commands_but_not_echoed_to_output() {
    struct CheckSecret {
        context: ExecutionContext,
    }
    impl ExecutionCommand for CheckSecret {
        fn name(&self) -> &str {
            "check-secret"
        }
        fn context(&self) -> &ExecutionContext {
            &self.context
        }
        fn context_mut(&mut self) -> &mut ExecutionContext {
            &mut self.context
        }
        fn validate(&mut self) -> Result<bool> {
            Ok(self.context.validate(&["systems.vault.password"]))
        }
        fn execute(&mut self) -> Result<Outcome> {
            assert_eq!(
                self.context.input_str("systems.vault.password").as_deref(),
                Some("expected_secure_password")
            );
            self.context.output_param_set("params.result", Value::from("OK"));
            self.context.output_params_save()?;
            Ok(Outcome::Done)
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let context = ExecutionContext::ephemeral(
        Some(dir.path()),
        None,
        Some(params(
            "systems:\n  vault:\n    password: expected_secure_password\n",
        )),
    )
    .unwrap();

    let mut runner = CommandRunner::new(CheckSecret { context });
    assert_eq!(runner.run(), 0);

    let artifact = std::fs::read_to_string(dir.path().join("output/params.yaml")).unwrap();
    assert!(artifact.contains("OK"));
    assert!(!artifact.contains("expected_secure_password"));
}

#[test]
fn optional_params_fall_back_to_defaults() {
    struct OptionalParamCommand {
        context: ExecutionContext,
    }
    impl ExecutionCommand for OptionalParamCommand {
        fn name(&self) -> &str {
            "optional-param"
        }
        fn context(&self) -> &ExecutionContext {
            &self.context
        }
        fn context_mut(&mut self) -> &mut ExecutionContext {
            &mut self.context
        }
        fn validate(&mut self) -> Result<bool> {
            Ok(self
                .context
                .validate(&["paths.input.params", "paths.output.params"]))
        }
        fn execute(&mut self) -> Result<Outcome> {
            let value = self.context.input_i64("params.empty_param")?.unwrap_or(123);
            self.context.output_param_set("params.result", Value::from(value));
            self.context.output_params_save()?;
            Ok(Outcome::Done)
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let context = ExecutionContext::ephemeral(Some(dir.path()), None, None).unwrap();
    let mut runner = CommandRunner::new(OptionalParamCommand { context });

    assert_eq!(runner.run(), 0);
    assert_eq!(saved_result(dir.path()), 123);
}
