//! Tests for awaited foreign calls and the scheduler

use std::cell::RefCell;
use std::rc::Rc;

use super::helpers::{error_of, num, op, output_of, run, run_with, text};
use crate::config::InterpreterConfig;
use crate::executor::types::UserFunction;
use crate::executor::{
    errors, Arity, BinaryOpKind, Callable, DictKey, EvalError, ForeignError, ForeignFunction, Module, Node,
    Value,
};

/// Host module whose async `record` appends its argument to `log`; `count`
/// reports how many records have landed so far
fn recorder(log: Rc<RefCell<Vec<Value>>>) -> Module {
    let seen = Rc::clone(&log);
    Module::new("recorder")
        .function(ForeignFunction::asynchronous(
            "recorder",
            "record",
            Arity::Exact(1),
            move |args| {
                let log = Rc::clone(&log);
                async move {
                    let value = args.value(0)?.clone();
                    tokio::task::yield_now().await;
                    log.borrow_mut().push(value.clone());
                    Ok::<_, ForeignError>(value)
                }
            },
        ))
        .function(ForeignFunction::sync(
            "recorder",
            "count",
            Arity::Exact(0),
            move |_| Ok(Value::Int(seen.borrow().len() as i64)),
        ))
}

fn awaited_with_keywords(
    module: &str,
    function_name: &str,
    positional_args: Vec<Node>,
    keyword_args: Vec<(&str, Node)>,
) -> Node {
    Node::ForeignCall {
        module: module.to_string(),
        function_name: function_name.to_string(),
        positional_args,
        keyword_args: keyword_args
            .into_iter()
            .map(|(name, node)| (name.to_string(), node))
            .collect(),
        is_awaited: true,
    }
}

/* ===================== Awaiting ===================== */

#[test]
fn test_await_async_foreign_call() {
    let program = Node::block([
        Node::import("asyncio"),
        Node::print(Node::awaited("asyncio", "echo", vec![num(7)])),
    ]);

    assert_eq!(output_of(program), "7\n");
}

#[test]
fn test_await_with_keyword_argument() {
    let program = Node::block([
        Node::import("asyncio"),
        Node::print(awaited_with_keywords(
            "asyncio",
            "sleep",
            vec![num(0)],
            vec![("result", text("done"))],
        )),
    ]);

    assert_eq!(output_of(program), "done\n");
}

#[test]
fn test_unawaited_async_call_yields_task() {
    let run = run(Node::block([
        Node::import("asyncio"),
        Node::foreign_call("asyncio", "echo", vec![num(1)]),
    ]));

    match run.result.unwrap() {
        Value::Task(task) => {
            assert_eq!(task.name(), "asyncio.echo");
            assert!(task.is_finished());
        }
        other => panic!("Expected task, got {:?}", other),
    }
    assert_eq!(run.interpreter.environment().scheduler.outstanding(), 0);
}

#[test]
fn test_fire_and_forget_tasks_complete_before_run_ends() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let program = Node::block([
        Node::import("recorder"),
        Node::foreign_call("recorder", "record", vec![num(1)]),
        Node::foreign_call("recorder", "record", vec![num(2)]),
        Node::print(text("issued")),
    ]);

    let run = run_with(program, InterpreterConfig::default(), vec![recorder(Rc::clone(&log))]);

    assert!(run.result.is_ok());
    assert_eq!(run.output, "issued\n");
    assert_eq!(*log.borrow(), vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_awaited_task_runs_before_next_statement() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let program = Node::block([
        Node::import("recorder"),
        Node::awaited("recorder", "record", vec![num(1)]),
        Node::assign("seen", num(0)),
    ]);

    let run = run_with(program, InterpreterConfig::default(), vec![recorder(Rc::clone(&log))]);

    assert_eq!(run.result.unwrap(), Value::Int(0));
    assert_eq!(*log.borrow(), vec![Value::Int(1)]);
}

#[test]
fn test_task_value_stored_and_printed() {
    let program = Node::block([
        Node::import("asyncio"),
        Node::assign("t", Node::foreign_call("asyncio", "echo", vec![num(1)])),
        Node::print(Node::var("t")),
    ]);

    assert_eq!(output_of(program), "<task asyncio.echo>\n");
}

/* ===================== Await Errors ===================== */

#[test]
fn test_awaiting_sync_foreign_function() {
    let err = error_of(Node::block([
        Node::import("math"),
        Node::awaited("math", "sqrt", vec![num(4)]),
    ]));

    assert_eq!(err.kind(), errors::TYPE_MISMATCH);
    assert!(err.to_string().contains("can't be used in 'await' expression"));
}

#[test]
fn test_awaiting_source_defined_function() {
    let local = Value::Callable(Callable::User(Rc::new(UserFunction {
        name: "local".to_string(),
        params: Vec::new(),
        body: Rc::new(Node::print(text("ran"))),
    })));
    let mut entries = indexmap::IndexMap::new();
    entries.insert(DictKey::Str("local".to_string()), local);

    let mut interpreter = crate::executor::Interpreter::new(InterpreterConfig::default());
    interpreter
        .environment_mut()
        .variables
        .insert("ns".to_string(), Value::dict(entries));

    let program = Node::awaited("ns", "local", vec![]);
    let result = crate::executor::block_on_interpreter(&mut interpreter, &program);

    match result {
        Err(EvalError::TypeMismatch { message }) => assert!(message.contains("cannot await 'local'")),
        other => panic!("Expected TypeMismatchError, got {:?}", other),
    }
}

#[test]
fn test_failed_awaited_task() {
    let err = error_of(Node::block([
        Node::import("asyncio"),
        Node::awaited("asyncio", "sleep", vec![text("soon")]),
    ]));

    match err {
        EvalError::Foreign { function, message } => {
            assert_eq!(function, "asyncio.sleep");
            assert!(message.contains("must be a number"));
        }
        other => panic!("Expected ForeignError, got {:?}", other),
    }
}

#[test]
fn test_failed_fire_and_forget_task_fails_run() {
    let failing = Module::new("host").function(ForeignFunction::asynchronous(
        "host",
        "explode",
        Arity::Exact(0),
        |_| async { Err::<Value, _>(ForeignError::new("boom")) },
    ));
    let program = Node::block([
        Node::import("host"),
        Node::foreign_call("host", "explode", vec![]),
        Node::print(text("still running")),
    ]);

    let run = run_with(program, InterpreterConfig::default(), vec![failing]);

    // The statements after the call complete; the failure surfaces at the end
    assert_eq!(run.output, "still running\n");
    match run.result {
        Err(err) => assert_eq!(err.kind(), errors::FOREIGN),
        Ok(value) => panic!("Expected ForeignError, got {:?}", value),
    }
}

/* ===================== Sleep ===================== */

#[test]
fn test_sleep_statement() {
    let program = Node::block([
        Node::Sleep {
            duration_seconds: Box::new(num(0)),
        },
        Node::print(text("woke")),
    ]);

    assert_eq!(output_of(program), "woke\n");
}

#[test]
fn test_sleep_rejects_negative_duration() {
    let err = error_of(Node::Sleep {
        duration_seconds: Box::new(num(-1)),
    });
    assert_eq!(err.kind(), errors::TYPE_MISMATCH);
}

#[test]
fn test_sleep_rejects_out_of_range_duration() {
    let err = error_of(Node::block([
        Node::import("math"),
        Node::Sleep {
            duration_seconds: Box::new(Node::foreign_call("math", "pow", vec![num(10), num(300)])),
        },
    ]));

    assert_eq!(err.kind(), errors::TYPE_MISMATCH);
    assert!(err.to_string().contains("in range"));
}

#[test]
fn test_foreign_sleep_rejects_out_of_range_duration() {
    let err = error_of(Node::block([
        Node::import("math"),
        Node::import("time"),
        Node::awaited(
            "time",
            "sleep",
            vec![Node::foreign_call("math", "pow", vec![num(10), num(300)])],
        ),
    ]));

    match err {
        EvalError::Foreign { function, message } => {
            assert_eq!(function, "time.sleep");
            assert!(message.contains("in range"));
        }
        other => panic!("Expected ForeignError, got {:?}", other),
    }
}

#[test]
fn test_issued_tasks_wait_for_a_suspension_point() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let program = Node::block([
        Node::import("recorder"),
        Node::foreign_call("recorder", "record", vec![num(1)]),
        Node::print(Node::foreign_call("recorder", "count", vec![])),
    ]);

    let run = run_with(program, InterpreterConfig::default(), vec![recorder(Rc::clone(&log))]);

    assert_eq!(run.output, "0\n");
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_sleep_lets_pending_tasks_run() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let program = Node::block([
        Node::import("recorder"),
        Node::foreign_call("recorder", "record", vec![num(1)]),
        Node::Sleep {
            duration_seconds: Box::new(op(BinaryOpKind::Div, num(1), num(100))),
        },
        Node::print(Node::foreign_call("recorder", "count", vec![])),
    ]);

    let run = run_with(program, InterpreterConfig::default(), vec![recorder(Rc::clone(&log))]);

    assert!(run.result.is_ok());
    assert_eq!(run.output, "1\n");
}

#[test]
fn test_awaiting_runs_earlier_tasks_first() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let program = Node::block([
        Node::import("recorder"),
        Node::foreign_call("recorder", "record", vec![num(1)]),
        Node::foreign_call("recorder", "record", vec![num(2)]),
        Node::awaited("recorder", "record", vec![num(3)]),
        Node::print(Node::foreign_call("recorder", "count", vec![])),
    ]);

    let run = run_with(program, InterpreterConfig::default(), vec![recorder(Rc::clone(&log))]);

    assert!(run.result.is_ok());
    assert_eq!(run.output, "3\n");
    assert_eq!(*log.borrow(), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
}
