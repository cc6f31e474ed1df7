//! Request dispatcher
//!
//! Validates an envelope, routes it to the store or the arithmetic executor,
//! and always produces a reply carrying the request id. Domain errors never
//! escape as faults; they become `ok=false` replies.

use crate::arith::ArithOp;
use crate::decimal::{Decimal, DEFAULT_DIV_PRECISION, MAX_DIV_PRECISION};
use crate::engine::NumberStore;
use crate::error::DispatchError;
use crate::resolver::resolve_pair;
use crate::types::{Reply, Request, PROTOCOL_VERSION};
use std::num::NonZeroU64;
use std::sync::Arc;
use tracing::debug;

/// A recognized method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Create,
    Set,
    Delete,
    Calc(ArithOp),
}

impl Method {
    /// Look up a method by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "create" => Some(Method::Create),
            "set" => Some(Method::Set),
            "delete" => Some(Method::Delete),
            other => other.parse().ok().map(Method::Calc),
        }
    }

    /// Minimum number of params; extra params are ignored
    pub fn arity(&self) -> usize {
        match self {
            Method::Delete => 1,
            _ => 2,
        }
    }
}

/// Outcome of a successful request
struct Outcome {
    msg: String,
    result: String,
}

impl Outcome {
    fn done(msg: String) -> Self {
        Self {
            msg,
            result: String::new(),
        }
    }
}

/// Validate protocol version, method name and params arity
pub fn validate(request: &Request) -> Result<Method, DispatchError> {
    if !request.has_supported_version() {
        return Err(DispatchError::EnvelopeInvalid(format!(
            "protocol version {} not supported, expected {}",
            request.protocol_version, PROTOCOL_VERSION
        )));
    }

    let method = Method::from_name(&request.method).ok_or_else(|| {
        DispatchError::EnvelopeInvalid(format!("unknown method {:?}", request.method))
    })?;

    if request.params.len() < method.arity() {
        return Err(DispatchError::EnvelopeInvalid(format!(
            "{} expects {} params, got {}",
            request.method,
            method.arity(),
            request.params.len()
        )));
    }

    Ok(method)
}

/// Routes requests against a shared store
pub struct Dispatcher {
    store: Arc<NumberStore>,
    div_precision: NonZeroU64,
}

impl Dispatcher {
    pub fn new(store: Arc<NumberStore>) -> Self {
        Self {
            store,
            div_precision: NonZeroU64::new(DEFAULT_DIV_PRECISION).unwrap_or(NonZeroU64::MIN),
        }
    }

    /// Set division precision in significant digits (clamped to 1..=100)
    pub fn with_div_precision(mut self, digits: u64) -> Self {
        let digits = digits.clamp(1, MAX_DIV_PRECISION);
        self.div_precision = NonZeroU64::new(digits).unwrap_or(NonZeroU64::MIN);
        self
    }

    pub fn div_precision(&self) -> u64 {
        self.div_precision.get()
    }

    pub fn store(&self) -> &Arc<NumberStore> {
        &self.store
    }

    /// Serve one request; never fails
    pub fn serve(&self, request: &Request) -> Reply {
        debug!(id = request.id, method = %request.method, params = ?request.params, "request received");

        match self.execute(request) {
            Ok(outcome) => Reply::success(request.id, outcome.msg, outcome.result),
            Err(err) => {
                debug!(id = request.id, kind = err.kind(), error = %err, "request rejected");
                Reply::failure(request.id, err.to_string())
            }
        }
    }

    fn execute(&self, request: &Request) -> Result<Outcome, DispatchError> {
        let params = &request.params;

        match validate(request)? {
            Method::Create => self.create(&params[0], &params[1]),
            Method::Set => self.set(&params[0], &params[1]),
            Method::Delete => self.delete(&params[0]),
            Method::Calc(op) => self.calc(op, &params[0], &params[1]),
        }
    }

    fn create(&self, name: &str, literal: &str) -> Result<Outcome, DispatchError> {
        // Numeric-looking names would shadow literals in operand resolution
        if Decimal::is_numeric_literal(name) {
            return Err(DispatchError::NameConflict(format!(
                "{} is a number and cannot be used as a name",
                name
            )));
        }

        let value = Decimal::parse(literal).map_err(|e| DispatchError::literal(literal, e))?;
        self.store.create(name, value)?;

        Ok(Outcome::done(format!("Create: {} success", name)))
    }

    fn set(&self, name: &str, literal: &str) -> Result<Outcome, DispatchError> {
        let value = Decimal::parse(literal).map_err(|e| DispatchError::literal(literal, e))?;
        self.store.set(name, value)?;

        Ok(Outcome::done(format!("Set: {} success", name)))
    }

    fn delete(&self, name: &str) -> Result<Outcome, DispatchError> {
        self.store.delete(name)?;

        Ok(Outcome::done(format!("Delete: {} success", name)))
    }

    fn calc(&self, op: ArithOp, a: &str, b: &str) -> Result<Outcome, DispatchError> {
        let (lhs, rhs) = resolve_pair(&self.store, a, b)?;
        let value = op.apply(&lhs, &rhs, self.div_precision)?;

        Ok(Outcome {
            msg: "Calculate success".to_string(),
            result: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use serde_json::json;
    use std::thread;
    use std::time::Duration;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(NumberStore::new()))
    }

    fn call(dispatcher: &Dispatcher, method: &str, params: &[&str], id: i64) -> Reply {
        dispatcher.serve(&Request::new(method, params.iter().copied(), id))
    }

    fn kind_of(dispatcher: &Dispatcher, method: &str, params: &[&str]) -> &'static str {
        let request = Request::new(method, params.iter().copied(), 0);
        dispatcher.execute(&request).err().map(|e| e.kind()).unwrap_or("ok")
    }

    #[test]
    fn test_create_then_conflict() {
        let dispatcher = dispatcher();

        let reply = call(&dispatcher, "create", &["grav_const", "0.000000000066731039356729"], 1);
        assert!(reply.ok, "{:?}", reply);
        assert_eq!(reply.id, 1);
        assert_eq!(reply.msg, "Create: grav_const success");
        assert_eq!(reply.result, "");

        let reply = call(&dispatcher, "create", &["grav_const", "1"], 2);
        assert!(!reply.ok);
        assert_eq!(reply.id, 2);
        assert_eq!(kind_of(&dispatcher, "create", &["grav_const", "1"]), "NameConflict");
    }

    #[test]
    fn test_set_then_mul() {
        let dispatcher = dispatcher();

        assert!(call(&dispatcher, "create", &["ggg", "12623451902.239174235"], 999).ok);
        assert!(call(&dispatcher, "set", &["ggg", "3"], 555).ok);

        let reply = call(&dispatcher, "mul", &["ggg", "0.005"], 1);
        assert!(reply.ok);
        assert_eq!(reply.result, "0.015");
    }

    #[test]
    fn test_add_literals() {
        let dispatcher = dispatcher();

        let reply = call(&dispatcher, "add", &["1", "0.005"], 1);
        assert!(reply.ok);
        assert_eq!(reply.result, "1.005");

        let reply = call(&dispatcher, "add", &["1", "abc"], 1);
        assert!(!reply.ok);
        assert!(reply.msg.starts_with("params[1] error"), "{}", reply.msg);
        assert_eq!(kind_of(&dispatcher, "add", &["1", "abc"]), "OperandUnresolvable");
    }

    #[test]
    fn test_div() {
        let dispatcher = dispatcher();

        let reply = call(&dispatcher, "div", &["5", "2.5"], 10);
        assert!(reply.ok);
        assert_eq!(reply.result, "2");

        let reply = call(&dispatcher, "div", &["5", "0"], 11);
        assert!(!reply.ok);
        assert_eq!(reply.result, "");
        assert_eq!(kind_of(&dispatcher, "div", &["5", "0.000"]), "DivisionByZero");
    }

    #[test]
    fn test_div_by_stored_zero() {
        let dispatcher = dispatcher();
        assert!(call(&dispatcher, "create", &["nothing", "0"], 1).ok);

        assert_eq!(kind_of(&dispatcher, "div", &["1", "nothing"]), "DivisionByZero");
    }

    #[test]
    fn test_div_precision_setting() {
        let dispatcher = dispatcher().with_div_precision(3);
        assert_eq!(dispatcher.div_precision(), 3);

        let reply = call(&dispatcher, "div", &["2", "3"], 1);
        assert_eq!(reply.result, "0.667");

        assert_eq!(dispatcher.with_div_precision(0).div_precision(), 1);
    }

    #[test]
    fn test_double_delete() {
        let dispatcher = dispatcher();
        assert!(call(&dispatcher, "create", &["ggg", "1"], 1).ok);

        // Extra params are ignored
        assert!(call(&dispatcher, "delete", &["ggg", "0.005"], 1).ok);

        let reply = call(&dispatcher, "delete", &["ggg", "0.005"], 1);
        assert!(!reply.ok);
        assert_eq!(kind_of(&dispatcher, "delete", &["ggg"]), "NameNotFound");
    }

    #[test]
    fn test_deleted_name_unresolvable() {
        let dispatcher = dispatcher();
        assert!(call(&dispatcher, "create", &["ggg", "1"], 1).ok);
        assert!(call(&dispatcher, "create", &["hhh", "2"], 1).ok);
        assert!(call(&dispatcher, "delete", &["ggg"], 1).ok);

        let reply = call(&dispatcher, "mul", &["ggg", "hhh"], 1);
        assert!(!reply.ok);
        assert!(reply.msg.starts_with("params[0] error"));
    }

    #[test]
    fn test_unsupported_version_keeps_id() {
        let dispatcher = dispatcher();
        let request = Request::new("create", ["ggg", "12623451902.239174235"], 0)
            .with_protocol_version(json!(1.2));

        let reply = dispatcher.serve(&request);
        assert!(!reply.ok);
        assert_eq!(reply.id, 0);
        assert!(reply.msg.starts_with("invalid envelope"));
        assert!(!dispatcher.store().exists("ggg"));

        let mut request = Request::new("add", ["1", "2"], 77);
        request.protocol_version = json!(1);
        assert!(dispatcher.serve(&request).ok);
    }

    #[test]
    fn test_unknown_method() {
        let dispatcher = dispatcher();

        let reply = call(&dispatcher, "xxx", &["hhh", "0"], 12);
        assert!(!reply.ok);
        assert_eq!(reply.id, 12);
        assert_eq!(kind_of(&dispatcher, "xxx", &["hhh", "0"]), "EnvelopeInvalid");
    }

    #[test]
    fn test_missing_params() {
        let dispatcher = dispatcher();

        assert_eq!(kind_of(&dispatcher, "create", &["only_name"]), "EnvelopeInvalid");
        assert_eq!(kind_of(&dispatcher, "delete", &[]), "EnvelopeInvalid");
        assert_eq!(kind_of(&dispatcher, "sub", &["1"]), "EnvelopeInvalid");
    }

    #[test]
    fn test_numeric_name_rejected() {
        let dispatcher = dispatcher();

        assert_eq!(kind_of(&dispatcher, "create", &["42", "1"]), "NameConflict");
        assert_eq!(kind_of(&dispatcher, "create", &["-1.5e3", "1"]), "NameConflict");
        // Grammar matches even though the exponent is out of range
        assert_eq!(kind_of(&dispatcher, "create", &["1e2000000", "1"]), "NameConflict");
        assert!(dispatcher.store().is_empty());
    }

    #[test]
    fn test_oversized_result_is_a_failed_reply() {
        let dispatcher = dispatcher();
        assert!(call(&dispatcher, "create", &["big", "1e1000000"], 1).ok);

        let reply = call(&dispatcher, "mul", &["big", "1e1000000"], 7);
        assert!(!reply.ok);
        assert_eq!(reply.id, 7);
        assert!(reply.result.is_empty());
        assert!(reply.msg.starts_with("result too large"), "{}", reply.msg);

        assert_eq!(kind_of(&dispatcher, "add", &["1e1000000", "1e-1000000"]), "ResultTooLarge");
        assert_eq!(kind_of(&dispatcher, "div", &["big", "1e-1000000"]), "ResultTooLarge");

        // The stored operand is untouched and still usable
        let reply = call(&dispatcher, "div", &["big", "1e999999"], 8);
        assert!(reply.ok);
        assert_eq!(reply.result, "10");
    }

    #[test]
    fn test_bad_literals_leave_store_unchanged() {
        let dispatcher = dispatcher();
        assert!(call(&dispatcher, "create", &["ggg", "3"], 1).ok);

        assert_eq!(kind_of(&dispatcher, "set", &["ggg", "asd"]), "LiteralParseError");
        assert_eq!(kind_of(&dispatcher, "create", &["hhh", "1..2"]), "LiteralParseError");
        assert_eq!(kind_of(&dispatcher, "set", &["popopop", "asd"]), "LiteralParseError");
        assert_eq!(kind_of(&dispatcher, "set", &["popopop", "1"]), "NameNotFound");

        assert_eq!(dispatcher.store().get("ggg"), Decimal::parse("3").ok());
        assert!(!dispatcher.store().exists("hhh"));
    }

    #[test]
    fn test_calc_does_not_mutate_store() {
        let dispatcher = dispatcher();
        assert!(call(&dispatcher, "create", &["ggg", "12623451902.239174235"], 1).ok);
        assert!(call(&dispatcher, "create", &["hhh", "12623451902.239174235"], 1).ok);

        let reply = call(&dispatcher, "sub", &["ggg", "hhh"], 1);
        assert!(reply.ok);
        assert_eq!(reply.result, "0");

        assert!(call(&dispatcher, "add", &["0.3", "0.005"], 1).ok);
        assert_eq!(dispatcher.store().len(), 2);
        assert_eq!(dispatcher.store().get_entry("ggg").unwrap().version, 1);
    }

    #[test]
    fn test_expired_entry_rejected_before_sweep() {
        let store = NumberStore::with_config(&StoreConfig::new().with_ttl(Duration::from_millis(10)));
        let dispatcher = Dispatcher::new(Arc::new(store));
        assert!(call(&dispatcher, "create", &["ggg", "1"], 1).ok);

        thread::sleep(Duration::from_millis(20));

        assert_eq!(kind_of(&dispatcher, "set", &["ggg", "2"]), "NameNotFound");
        assert_eq!(kind_of(&dispatcher, "add", &["ggg", "2"]), "OperandUnresolvable");
        assert!(call(&dispatcher, "create", &["ggg", "5"], 2).ok);
    }
}
