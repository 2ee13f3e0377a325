//! JavaScript evaluation engine using boa_engine
//!
//! Backs the `javascript{...}` argument escape and the conditions of
//! `gotoIf`, `if` and `while`.

use anyhow::{anyhow, Result};
use boa_engine::{Context, JsValue, Source};

use super::context::ExecutionContext;
use super::vars::VarsMap;

const GLOBALS_FROM_STORED_VARS: &str = r#"
(function (vars) {
    for (var key in vars) {
        if (key === "storedVars") continue;
        var value = vars[key];
        var number = Number(value);
        try {
            globalThis[key] = value !== "" && String(number) === value ? number
                : value === "true" ? true
                : value === "false" ? false
                : value;
        } catch (e) {}
    }
})(storedVars);
"#;

/// Evaluates embedded script expressions with access to the run context.
pub trait ScriptEvaluator: Send + Sync {
    /// Evaluate `expression`; `None` when the script yields no value.
    fn eval(&self, context: &ExecutionContext, expression: &str) -> Result<Option<String>>;

    /// Evaluate `expression` as a condition.
    fn eval_bool(&self, context: &ExecutionContext, expression: &str) -> Result<bool> {
        Ok(match self.eval(context, expression)? {
            Some(value) => !matches!(value.as_str(), "" | "false" | "0" | "NaN"),
            None => false,
        })
    }
}

/// [`ScriptEvaluator`] running each expression in a fresh boa context seeded
/// with the run's variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsEvaluator;

impl ScriptEvaluator for JsEvaluator {
    fn eval(&self, context: &ExecutionContext, expression: &str) -> Result<Option<String>> {
        let mut engine = JsEngine::new();
        engine.set_vars(context.vars())?;
        engine.eval_optional(expression).map_err(|e| anyhow!(e))
    }

    fn eval_bool(&self, context: &ExecutionContext, expression: &str) -> Result<bool> {
        let mut engine = JsEngine::new();
        engine.set_vars(context.vars())?;
        engine.eval_bool(expression).map_err(|e| anyhow!(e))
    }
}

/// JavaScript evaluation engine
pub struct JsEngine {
    context: Context,
}

impl JsEngine {
    /// Create a new JavaScript engine instance
    pub fn new() -> Self {
        Self {
            context: Context::default(),
        }
    }

    /// Expose variables as `storedVars` and as globals.
    ///
    /// Globals are copied from the parsed `storedVars` object, so any name is
    /// accepted. A value becomes a number only when it is the canonical JS
    /// rendering of that number (`"41"` yes, `"007"` or `"inf"` no), and
    /// `"true"`/`"false"` become booleans.
    pub fn set_vars(&mut self, vars: &VarsMap) -> Result<()> {
        let stored = serde_json::to_string(vars.as_map())?;
        let js_code = format!("var storedVars = {};\n{}", stored, GLOBALS_FROM_STORED_VARS);

        self.context
            .eval(Source::from_bytes(&js_code))
            .map_err(|e| anyhow!("JavaScript error: {}", e))?;
        Ok(())
    }

    /// Evaluate a JavaScript expression and return the result as a string
    pub fn eval(&mut self, expression: &str) -> Result<String, String> {
        self.eval_optional(expression)
            .map(|value| value.unwrap_or_else(|| "undefined".to_string()))
    }

    /// Evaluate a JavaScript expression; `undefined` and `null` yield `None`
    pub fn eval_optional(&mut self, expression: &str) -> Result<Option<String>, String> {
        match self.context.eval(Source::from_bytes(expression)) {
            Ok(result) if result.is_undefined() || result.is_null() => Ok(None),
            Ok(result) => Ok(Some(self.js_value_to_string(&result))),
            Err(e) => Err(format!("JavaScript error: {}", e)),
        }
    }

    /// Evaluate a JavaScript expression and return as boolean
    pub fn eval_bool(&mut self, expression: &str) -> Result<bool, String> {
        match self.context.eval(Source::from_bytes(expression)) {
            Ok(result) => Ok(result.to_boolean()),
            Err(e) => Err(format!("JavaScript error: {}", e)),
        }
    }

    /// Convert JsValue to String representation
    fn js_value_to_string(&mut self, value: &JsValue) -> String {
        if let Some(b) = value.as_boolean() {
            b.to_string()
        } else if let Some(n) = value.as_number() {
            if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                (n as i64).to_string()
            } else {
                n.to_string()
            }
        } else if let Some(s) = value.as_string() {
            s.to_std_string_escaped()
        } else {
            match value.to_string(&mut self.context) {
                Ok(s) => s.to_std_string_escaped(),
                Err(_) => format!("{:?}", value),
            }
        }
    }
}

impl Default for JsEngine {
    fn default() -> Self {
        Self::new()
    }
}
