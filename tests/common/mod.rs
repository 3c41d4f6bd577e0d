//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use hana_bridge::prelude::*;

#[derive(Debug, Clone)]
enum Response {
    Rows {
        columns: Vec<ColumnDescriptor>,
        rows: Vec<Vec<Value>>,
    },
    Fail(String),
}

#[derive(Debug, Default)]
pub struct State {
    /// Every SQL text passed to `run`, with its bound parameters.
    pub runs: Vec<(String, Vec<BoundValue>)>,
    pub prepared: Vec<String>,
    pub opened: usize,
    pub closed: usize,
    pub bound_outputs: Vec<(usize, usize, ParamType)>,
    pub executed: Vec<Vec<BoundValue>>,
    pub output_values: Vec<Value>,
    pub output_sizes: Vec<usize>,
    pub fail_bind_output: Option<String>,
    pub fail_fetch: Option<String>,
    pub disconnected: bool,
    rules: Vec<(String, Response)>,
}

impl State {
    fn respond(&self, sql: &str) -> Response {
        self.rules
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or(Response::Rows {
                columns: Vec::new(),
                rows: Vec::new(),
            })
    }
}

/// Responds to SQL by substring rules, first match wins.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Rc<RefCell<State>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, pattern: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> &Self {
        let columns = columns.iter().map(|c| ColumnDescriptor::new(*c, "NVARCHAR")).collect();
        self.state
            .borrow_mut()
            .rules
            .push((pattern.to_string(), Response::Rows { columns, rows }));
        self
    }

    /// Answer a single-value query.
    pub fn on_value(&self, pattern: &str, value: Value) -> &Self {
        self.on(pattern, &["VALUE"], vec![vec![value]])
    }

    pub fn fail_on(&self, pattern: &str, message: &str) -> &Self {
        self.state
            .borrow_mut()
            .rules
            .push((pattern.to_string(), Response::Fail(message.to_string())));
        self
    }

    pub fn with_outputs(&self, values: Vec<Value>) -> &Self {
        self.state.borrow_mut().output_values = values;
        self
    }

    pub fn report_output_sizes(&self, sizes: Vec<usize>) -> &Self {
        self.state.borrow_mut().output_sizes = sizes;
        self
    }

    pub fn fail_bind_output(&self, message: &str) -> &Self {
        self.state.borrow_mut().fail_bind_output = Some(message.to_string());
        self
    }

    pub fn fail_fetch(&self, message: &str) -> &Self {
        self.state.borrow_mut().fail_fetch = Some(message.to_string());
        self
    }

    pub fn state(&self) -> Ref<'_, State> {
        self.state.borrow()
    }

    /// SQL texts sent through `run`, in order.
    pub fn statements(&self) -> Vec<String> {
        self.state.borrow().runs.iter().map(|(sql, _)| sql.clone()).collect()
    }

    /// Number of transport calls of any kind.
    pub fn calls(&self) -> usize {
        let state = self.state.borrow();
        state.runs.len() + state.prepared.len()
    }

    pub fn forget(&self) {
        let mut state = self.state.borrow_mut();
        state.runs.clear();
        state.prepared.clear();
    }

    pub fn assert_balanced(&self) {
        let state = self.state.borrow();
        assert_eq!(state.opened, state.closed, "statement handles opened != closed");
    }

    pub fn boxed(&self) -> Box<dyn Transport> {
        Box::new(self.clone())
    }
}

impl Transport for MockTransport {
    fn run(&mut self, sql: &str, params: &[BoundValue]) -> TransportResult<Box<dyn Statement>> {
        let response = {
            let mut state = self.state.borrow_mut();
            state.runs.push((sql.to_string(), params.to_vec()));
            state.respond(sql)
        };
        match response {
            Response::Fail(message) => Err(TransportError::new(message)),
            Response::Rows { columns, rows } => {
                self.state.borrow_mut().opened += 1;
                Ok(Box::new(MockStatement {
                    state: Rc::clone(&self.state),
                    columns,
                    rows,
                }))
            }
        }
    }

    fn prepare(&mut self, sql: &str) -> TransportResult<Box<dyn Statement>> {
        let mut state = self.state.borrow_mut();
        state.prepared.push(sql.to_string());
        state.opened += 1;
        Ok(Box::new(MockStatement {
            state: Rc::clone(&self.state),
            columns: Vec::new(),
            rows: Vec::new(),
        }))
    }

    fn disconnect(&mut self) -> TransportResult<()> {
        self.state.borrow_mut().disconnected = true;
        Ok(())
    }
}

struct MockStatement {
    state: Rc<RefCell<State>>,
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Vec<Value>>,
}

impl Statement for MockStatement {
    fn columns(&self) -> Vec<ColumnDescriptor> {
        self.columns.clone()
    }

    fn fetch_all(&mut self) -> TransportResult<Vec<Vec<Value>>> {
        if let Some(message) = &self.state.borrow().fail_fetch {
            return Err(TransportError::new(message.clone()));
        }
        Ok(std::mem::take(&mut self.rows))
    }

    fn bind_output(
        &mut self,
        index: usize,
        size: usize,
        param_type: ParamType,
    ) -> TransportResult<()> {
        let mut state = self.state.borrow_mut();
        if let Some(message) = &state.fail_bind_output {
            return Err(TransportError::new(message.clone()));
        }
        state.bound_outputs.push((index, size, param_type));
        Ok(())
    }

    fn output_size(&self, index: usize) -> Option<usize> {
        self.state.borrow().output_sizes.get(index).copied()
    }

    fn execute(&mut self, params: &[BoundValue]) -> TransportResult<()> {
        self.state.borrow_mut().executed.push(params.to_vec());
        Ok(())
    }

    fn output_value(&mut self, index: usize) -> TransportResult<Value> {
        Ok(self.state.borrow().output_values.get(index).cloned().unwrap_or(Value::Null))
    }

    fn close(&mut self) -> TransportResult<()> {
        self.state.borrow_mut().closed += 1;
        Ok(())
    }
}

pub fn test_config() -> ConnectionConfig {
    ConnectionConfig {
        dsn: Some("hana-test".into()),
        username: Some("SYSTEM".into()),
        password: Some("secret".into()),
        database: Some("app".into()),
        ..Default::default()
    }
}

/// A connection over `mock` that skips schema setup.
pub fn connect(mock: &MockTransport) -> HanaConnection {
    HanaConnection::new(mock.boxed(), test_config()).expect("valid test config")
}
