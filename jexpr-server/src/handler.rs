//! Request handler for jexpr-server

use jexpr_core::expr::parse_expr_with_depth;
use jexpr_core::{find_classes, EvalConfig, Evaluator, Request, Response, SnapshotFrame};
use tracing::{debug, info, warn};

pub struct Handler {
    evaluator: Evaluator,
    frame: Option<SnapshotFrame>,
}

impl Handler {
    pub fn new(config: EvalConfig) -> Self {
        Self {
            evaluator: Evaluator::with_config(config),
            frame: None,
        }
    }

    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::Attach { frame } => self.handle_attach(frame),
            Request::Eval { expr } => self.handle_eval(&expr),
            Request::Parse { expr } => self.handle_parse(&expr),
            Request::FindClasses { pattern } => self.handle_find_classes(&pattern),
            Request::Shutdown => {
                info!("Shutdown requested");
                Response::success()
            }
        }
    }

    fn handle_attach(&mut self, frame: SnapshotFrame) -> Response {
        info!(
            "Attached frame in {} ({} locals, {} types)",
            frame.current_type.as_deref().unwrap_or("<none>"),
            frame.locals.len(),
            frame.types.len()
        );
        let timeout = self.evaluator.config().invocation_timeout();
        self.frame = Some(frame.with_invocation_timeout(timeout));
        Response::success()
    }

    fn handle_eval(&mut self, expr: &str) -> Response {
        debug!("Eval request: expr={}", expr);
        let Some(frame) = self.frame.as_mut() else {
            return Response::error("No frame attached");
        };
        match self.evaluator.evaluate_str(expr, frame) {
            Ok(value) => Response::eval_result(value),
            Err(e) => {
                warn!("Evaluation of '{}' failed: {}", expr, e);
                Response::eval_error(&e)
            }
        }
    }

    fn handle_parse(&self, expr: &str) -> Response {
        debug!("Parse request: expr={}", expr);
        match parse_expr_with_depth(expr, self.evaluator.config().max_depth) {
            Ok(ast) => Response::parsed(ast),
            Err(e) => Response::eval_error(&e),
        }
    }

    fn handle_find_classes(&self, pattern: &str) -> Response {
        debug!("Find classes request: pattern={}", pattern);
        let Some(frame) = self.frame.as_ref() else {
            return Response::error("No frame attached");
        };
        match find_classes(frame, pattern) {
            Ok(classes) => Response::classes(classes),
            Err(e) => Response::eval_error(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jexpr_core::expr::Value;
    use jexpr_core::ErrorKind;

    fn attached() -> Handler {
        let frame = SnapshotFrame::from_json(
            r#"{
                "current_type": "demo.Main",
                "locals": {
                    "count": {"declared_type": "int", "value": {"Int": 41}}
                },
                "types": [
                    {"name": "demo.Main"},
                    {"name": "demo.MainHelper"}
                ]
            }"#,
        )
        .unwrap();
        let mut handler = Handler::new(EvalConfig::default());
        assert!(matches!(handler.handle(Request::Attach { frame }), Response::Success { ok: true }));
        handler
    }

    #[test]
    fn test_eval_without_frame() {
        let mut handler = Handler::new(EvalConfig::default());
        let response = handler.handle(Request::Eval { expr: "1".to_string() });
        assert!(matches!(response, Response::Error { kind: None, .. }));
    }

    #[test]
    fn test_eval_local() {
        let mut handler = attached();
        let response = handler.handle(Request::Eval { expr: "count + 1".to_string() });
        let Response::EvalResult { value, value_type, display } = response else {
            panic!("expected eval result");
        };
        assert_eq!(value, Value::Int(42));
        assert_eq!(value_type, "int");
        assert_eq!(display, "42");
    }

    #[test]
    fn test_assignment_persists_between_requests() {
        let mut handler = attached();
        handler.handle(Request::Eval { expr: "count = 7".to_string() });
        let response = handler.handle(Request::Eval { expr: "count".to_string() });
        assert!(matches!(response, Response::EvalResult { value: Value::Int(7), .. }));
    }

    #[test]
    fn test_eval_error_kind() {
        let mut handler = attached();
        let response = handler.handle(Request::Eval { expr: "count / 0".to_string() });
        assert!(matches!(response, Response::Error { kind: Some(ErrorKind::Arithmetic), .. }));
    }

    #[test]
    fn test_parse() {
        let handler = Handler::new(EvalConfig::default());
        let Response::Parsed { text, ast } = handler.handle_parse("a+b*2") else {
            panic!("expected parsed");
        };
        assert!(ast.is_some());
        assert_eq!(text.as_deref(), Some("a + b * 2"));

        let Response::Parsed { ast, .. } = handler.handle_parse("   ") else {
            panic!("expected parsed");
        };
        assert!(ast.is_none());
    }

    #[test]
    fn test_find_classes() {
        let mut handler = attached();
        let response = handler.handle(Request::FindClasses { pattern: "demo.Main*".to_string() });
        let Response::Classes { classes } = response else {
            panic!("expected classes");
        };
        assert_eq!(classes, vec!["demo.Main", "demo.MainHelper"]);
    }
}
