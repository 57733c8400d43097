// ============================================
// File: crates/ooband-server/src/services/dsl.rs
// ============================================
//! # Callback DSL
//!
//! ## Creation Reason
//! Callback predicates and actions are small scripts supplied by clients.
//! The engine only needs "is this true" and "run this", so evaluation sits
//! behind a trait and the Lua implementation is one choice among many.
//!
//! ## Lua Environment
//! | Global        | Value                                  |
//! |---------------|----------------------------------------|
//! | `protocol`    | `"dns"`, `"http"` or `"smtp"`          |
//! | `remote_addr` | `"ip:port"`                            |
//! | `from`        | envelope sender or `""`                |
//! | `to`          | sequence of recipients / names         |
//! | `data`        | message body or raw request            |
//! | `log(msg)`    | writes `msg` to the server log         |
//!
//! Only `string`, `table` and `math` are loaded; no `io`, `os` or `require`.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every evaluation gets a fresh state; scripts cannot share globals
//! - The instruction hook is what actually stops runaway scripts

use std::time::{Duration, Instant};

use mlua::{HookTriggers, Lua, LuaOptions, StdLib, VmState};
use tracing::info;

use crate::error::{Result, ServerError};
use crate::services::callbacks::CallbackBinding;

/// Instructions between deadline checks.
const HOOK_INTERVAL: u32 = 1_000;

/// Memory available to one script.
const MEMORY_LIMIT: usize = 16 * 1024 * 1024;

// ============================================
// DslEvaluator
// ============================================

/// Evaluates callback predicates and actions.
///
/// Implementations are called from the blocking pool and may block.
pub trait DslEvaluator: Send + Sync + 'static {
    /// Evaluates `expr` against `binding`.
    ///
    /// # Errors
    /// `DslEvaluation` when the expression cannot be evaluated.
    fn evaluate_predicate(&self, expr: &str, binding: &CallbackBinding) -> Result<bool>;

    /// Runs `code` with `binding` in scope.
    ///
    /// # Errors
    /// `DslEvaluation` when the code fails or is aborted.
    fn execute_action(&self, code: &str, binding: &CallbackBinding) -> Result<()>;
}

// ============================================
// LuaEvaluator
// ============================================

/// Lua 5.4 [`DslEvaluator`].
#[derive(Debug, Clone)]
pub struct LuaEvaluator {
    budget: Duration,
}

impl LuaEvaluator {
    /// Creates an evaluator aborting scripts after `budget`.
    #[must_use]
    pub const fn new(budget: Duration) -> Self {
        Self { budget }
    }

    fn state(&self, binding: &CallbackBinding) -> mlua::Result<Lua> {
        let lua = Lua::new_with(
            StdLib::STRING | StdLib::TABLE | StdLib::MATH,
            LuaOptions::new(),
        )?;
        lua.set_memory_limit(MEMORY_LIMIT)?;

        let deadline = Instant::now() + self.budget;
        lua.set_hook(
            HookTriggers::new().every_nth_instruction(HOOK_INTERVAL),
            move |_lua, _debug| {
                if Instant::now() > deadline {
                    return Err(mlua::Error::RuntimeError("script deadline exceeded".into()));
                }
                Ok(VmState::Continue)
            },
        );

        let globals = lua.globals();
        globals.set("protocol", binding.protocol.as_str())?;
        globals.set("remote_addr", binding.remote_addr.as_str())?;
        globals.set("from", binding.from.as_str())?;
        globals.set("to", binding.to.clone())?;
        globals.set("data", binding.data.as_str())?;

        let protocol = binding.protocol;
        let log = lua.create_function(move |_, msg: String| {
            info!(target: "ooband::callback", %protocol, "{}", msg);
            Ok(())
        })?;
        globals.set("log", log)?;

        Ok(lua)
    }
}

fn dsl_error(err: &mlua::Error) -> ServerError {
    ServerError::DslEvaluation(err.to_string())
}

impl DslEvaluator for LuaEvaluator {
    fn evaluate_predicate(&self, expr: &str, binding: &CallbackBinding) -> Result<bool> {
        let lua = self.state(binding).map_err(|e| dsl_error(&e))?;
        lua.load(expr)
            .set_name("predicate")
            .eval::<bool>()
            .map_err(|e| dsl_error(&e))
    }

    fn execute_action(&self, code: &str, binding: &CallbackBinding) -> Result<()> {
        let lua = self.state(binding).map_err(|e| dsl_error(&e))?;
        lua.load(code)
            .set_name("action")
            .exec()
            .map_err(|e| dsl_error(&e))
    }
}
