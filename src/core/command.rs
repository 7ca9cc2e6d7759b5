//! Command lifecycle: validate → pre-hooks → execute → post-hooks → exit code.
//!
//! Early termination is modeled as a value (`Outcome`) returned up through
//! the body and the hooks instead of a non-local exit; `CommandRunner::run`
//! is the single point that maps outcomes to the numeric exit code. Only
//! the CLI binary turns that code into process termination, which keeps
//! commands embeddable (and testable) inside other commands.

use crate::core::context::ExecutionContext;
use crate::core::error::{Error, Result};
use crate::core::logger::ExecutionLogger;

/// What a command body or extension decided about the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Proceed with the remaining lifecycle stages.
    Done,
    /// Terminate the run with the given disposition and message.
    Stop { success: bool, message: String },
}

impl Outcome {
    pub fn stop_failure(message: impl Into<String>) -> Self {
        Outcome::Stop {
            success: false,
            message: message.into(),
        }
    }

    pub fn stop_success(message: impl Into<String>) -> Self {
        Outcome::Stop {
            success: true,
            message: message.into(),
        }
    }
}

/// One unit of pipeline work driven by an [`ExecutionContext`].
///
/// `validate` performs the required-path check plus derived-field
/// population and returns `Ok(false)` on any violation; `execute` is the
/// command body. Unexpected errors from either are caught by the runner
/// and mapped to a failure exit, never propagated out of `run`.
pub trait ExecutionCommand {
    fn name(&self) -> &str;
    fn context(&self) -> &ExecutionContext;
    fn context_mut(&mut self) -> &mut ExecutionContext;
    fn validate(&mut self) -> Result<bool>;
    fn execute(&mut self) -> Result<Outcome>;
}

/// Hook executed before or after a command's body.
///
/// Extensions share mutable state with the command by contract: they
/// receive the command itself (and through it the context) and may rewrite
/// previously-parsed parameters, append output params, or stop the run.
/// Pre-hooks run after validation in registration order, each seeing the
/// mutations of the ones before it; post-hooks run after the body whether
/// it completed or stopped.
pub trait CommandExtension<C: ExecutionCommand> {
    fn execute(&mut self, command: &mut C) -> Result<Outcome>;
}

pub struct CommandRunner<C: ExecutionCommand> {
    command: C,
    pre_execute_actions: Vec<Box<dyn CommandExtension<C>>>,
    post_execute_actions: Vec<Box<dyn CommandExtension<C>>>,
}

impl<C: ExecutionCommand> CommandRunner<C> {
    pub fn new(command: C) -> Self {
        Self {
            command,
            pre_execute_actions: Vec::new(),
            post_execute_actions: Vec::new(),
        }
    }

    pub fn with_pre_action(mut self, action: Box<dyn CommandExtension<C>>) -> Self {
        self.pre_execute_actions.push(action);
        self
    }

    pub fn with_post_action(mut self, action: Box<dyn CommandExtension<C>>) -> Self {
        self.post_execute_actions.push(action);
        self
    }

    pub fn command(&self) -> &C {
        &self.command
    }

    pub fn into_command(self) -> C {
        self.command
    }

    /// Drive the full lifecycle and return the exit code: 0 for success,
    /// 1 for validation failure, explicit stop-with-failure, or body error.
    pub fn run(&mut self) -> i32 {
        let code = self.drive();
        let logger = self.command.context().logger();
        if code == 0 {
            logger.info("Status: SUCCESS");
        } else {
            logger.error("Status: FAILURE");
        }
        code
    }

    fn drive(&mut self) -> i32 {
        match self.command.validate() {
            Ok(true) => {}
            Ok(false) => return 1,
            Err(e) => {
                log_error(self.command.context().logger(), &e);
                return 1;
            }
        }

        for action in self.pre_execute_actions.iter_mut() {
            match action.execute(&mut self.command) {
                Ok(Outcome::Done) => {}
                Ok(Outcome::Stop { success, message }) => {
                    log_stop(self.command.context().logger(), success, &message);
                    return if success { 0 } else { 1 };
                }
                Err(e) => {
                    log_error(self.command.context().logger(), &e);
                    return 1;
                }
            }
        }

        let mut code = match self.command.execute() {
            Ok(Outcome::Done) => 0,
            Ok(Outcome::Stop { success, message }) => {
                log_stop(self.command.context().logger(), success, &message);
                if success {
                    0
                } else {
                    1
                }
            }
            Err(e) => {
                log_error(self.command.context().logger(), &e);
                return 1;
            }
        };

        for action in self.post_execute_actions.iter_mut() {
            match action.execute(&mut self.command) {
                Ok(Outcome::Done) => {}
                Ok(Outcome::Stop { success, message }) => {
                    log_stop(self.command.context().logger(), success, &message);
                    code = if success { 0 } else { 1 };
                }
                Err(e) => {
                    log_error(self.command.context().logger(), &e);
                    code = 1;
                }
            }
        }

        code
    }
}

fn log_stop(logger: &ExecutionLogger, success: bool, message: &str) {
    if success {
        logger.info(message);
    } else {
        logger.error(message);
    }
}

fn log_error(logger: &ExecutionLogger, error: &Error) {
    logger.error(format!("{} [{}]", error.message, error.code.as_str()));
    if !error.details.is_null() {
        logger.debug(format!("Error details: {}", error.details));
    }
    for hint in &error.hints {
        logger.info(format!("Hint: {}", hint.message));
    }
}
