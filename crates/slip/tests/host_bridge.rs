//! The host capability surface: scheme handlers, host objects, module
//! import, templates, print plumbing and resource limits.

use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;
use slip::{
    Error, ErrorKind, HostObject, Interpreter, LimitedTracker, ModuleSource, Path, PrintWriter,
    SchemeHandler, SchemeOp, Value,
};

// === Test doubles ===

/// In-memory key/value scheme handler. Keys are the scheme-path remainder.
#[derive(Debug, Default)]
struct MemScheme {
    store: RefCell<IndexMap<String, Value>>,
    posts: RefCell<Vec<(String, Value)>>,
}

impl MemScheme {
    fn key(path: &Path) -> String {
        path.last_name().unwrap_or_default().to_owned()
    }
}

impl SchemeHandler for MemScheme {
    fn handle(
        &self,
        op: SchemeOp,
        path: &Path,
        _configuration: &IndexMap<String, Value>,
        payload: Option<Value>,
    ) -> Result<Value, Error> {
        let key = Self::key(path);
        match op {
            SchemeOp::Read => self
                .store
                .borrow()
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::new(ErrorKind::PathNotFound, format!("`{key}` not found"))),
            SchemeOp::Write => {
                let value = payload.expect("write carries a payload");
                self.store.borrow_mut().insert(key, value.clone());
                Ok(value)
            }
            SchemeOp::Delete => {
                self.store.borrow_mut().shift_remove(&key);
                Ok(Value::None)
            }
            SchemeOp::Post => {
                let body = payload.expect("post carries a payload");
                self.posts.borrow_mut().push((key, body));
                Ok(Value::str("accepted"))
            }
        }
    }
}

#[derive(Debug)]
struct Device {
    data: RefCell<IndexMap<String, Value>>,
    pings: RefCell<usize>,
}

impl Device {
    fn new() -> Self {
        let mut data = IndexMap::new();
        data.insert("name".to_owned(), Value::str("thermostat"));
        Self {
            data: RefCell::new(data),
            pings: RefCell::new(0),
        }
    }
}

impl HostObject for Device {
    fn id(&self) -> &str {
        "device-1"
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.data.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), Error> {
        self.data.borrow_mut().insert(key.to_owned(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), Error> {
        self.data.borrow_mut().shift_remove(key);
        Ok(())
    }

    fn methods(&self) -> Vec<String> {
        vec!["ping_device".to_owned()]
    }

    fn call(&self, method: &str, _args: Vec<Value>) -> Result<Value, Error> {
        match method {
            "ping_device" => {
                *self.pings.borrow_mut() += 1;
                Ok(Value::str("pong"))
            }
            other => Err(Error::new(
                ErrorKind::Unimplemented,
                format!("unknown method `{other}`"),
            )),
        }
    }
}

struct CountingModules {
    loads: RefCell<usize>,
}

impl ModuleSource for CountingModules {
    fn load(&self, path: &Path) -> Result<String, Error> {
        *self.loads.borrow_mut() += 1;
        match path.canonical().as_str() {
            "answers" => Ok("answer: 42".to_owned()),
            other => Err(Error::new(
                ErrorKind::PathNotFound,
                format!("no module `{other}`"),
            )),
        }
    }
}

#[derive(Clone, Default)]
struct SharedPrint(Rc<RefCell<String>>);

impl PrintWriter for SharedPrint {
    fn write_line(&mut self, text: &str) {
        self.0.borrow_mut().push_str(text);
        self.0.borrow_mut().push('\n');
    }
}

fn with_mem() -> (Interpreter, Rc<MemScheme>) {
    let interp = Interpreter::new();
    let scheme = Rc::new(MemScheme::default());
    interp.register_scheme_handler("mem", Rc::clone(&scheme) as Rc<dyn SchemeHandler>);
    (interp, scheme)
}

// === Scheme paths ===

#[test]
fn scheme_write_then_read_round_trips() {
    let (interp, _) = with_mem();
    let write = interp.execute("mem://greeting: 'hi'");
    assert!(write.is_success(), "{:?}", write.error_message);
    assert_eq!(write.value, Value::str("hi"), "set yields the written value");
    assert_eq!(interp.execute("mem://greeting").value, Value::str("hi"));
}

#[test]
fn scheme_delete_forwards_to_the_handler() {
    let (interp, scheme) = with_mem();
    interp.execute("mem://temp: 1");
    assert!(interp.execute("~mem://temp").is_success());
    assert!(scheme.store.borrow().is_empty());
}

#[test]
fn missing_scheme_reads_are_runtime_errors_by_default() {
    let (interp, _) = with_mem();
    let result = interp.execute("mem://nope");
    assert_eq!(result.error_status, Some(404));
}

#[test]
fn lite_mode_surfaces_status_as_data() {
    let (interp, _) = with_mem();
    interp.execute("mem://greeting: 'hi'");
    assert_eq!(
        interp.execute("mem://greeting#(lite: true)").value,
        Value::list(vec![Value::Int(200), Value::str("hi")])
    );
    let miss = interp.execute("mem://nope#(lite: true)");
    assert!(miss.is_success(), "lite mode never raises");
    let Value::List(pair) = &miss.value else {
        panic!("expected a [status, body] pair");
    };
    assert_eq!(pair.borrow()[0], Value::Int(404));
}

#[test]
fn full_mode_returns_a_status_dict() {
    let (interp, _) = with_mem();
    let result = interp.execute("mem://nope#(full: true)");
    assert!(result.is_success());
    let Value::Dict(map) = &result.value else {
        panic!("expected a dict");
    };
    assert_eq!(map.borrow().get("status"), Some(&Value::Int(404)));
}

#[test]
fn post_paths_submit_the_body() {
    let (interp, scheme) = with_mem();
    let result = interp.execute("mem://inbox<- #{ level: 3 }");
    assert!(result.is_success(), "{:?}", result.error_message);
    assert_eq!(result.value, Value::str("accepted"));
    let posts = scheme.posts.borrow();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0, "inbox");
}

#[test]
fn json_content_type_serializes_the_body() {
    let (interp, scheme) = with_mem();
    let result = interp.execute("mem://inbox#(content-type: 'application/json')<- #{ a: 1 }");
    assert!(result.is_success(), "{:?}", result.error_message);
    let posts = scheme.posts.borrow();
    let Value::Str(body) = &posts[0].1 else {
        panic!("expected a serialized string body");
    };
    assert_eq!(&**body, r#"{"a":1}"#);
}

#[test]
fn unknown_schemes_are_unimplemented() {
    let interp = Interpreter::new();
    let result = interp.execute("ftp://somewhere");
    assert_eq!(result.error_status, Some(501));
}

// === Host objects ===

#[test]
fn attached_host_methods_become_kebab_case_functions() {
    let interp = Interpreter::new();
    let device = Rc::new(Device::new());
    interp.attach_host_object(Rc::clone(&device) as Rc<dyn HostObject>);
    assert_eq!(interp.execute("ping-device").value, Value::str("pong"));
    assert_eq!(*device.pings.borrow(), 1);
}

#[test]
fn host_objects_are_key_addressable() {
    let interp = Interpreter::new();
    let device = Rc::new(Device::new());
    interp.attach_host_object(Rc::clone(&device) as Rc<dyn HostObject>);
    assert_eq!(
        interp.execute("(host-object 'device-1').name").value,
        Value::str("thermostat")
    );
    assert!(interp
        .execute("(host-object 'device-1').name: 'boiler'")
        .is_success());
    assert_eq!(device.get("name"), Some(Value::str("boiler")));
}

#[test]
fn unknown_host_objects_are_none() {
    let interp = Interpreter::new();
    assert_eq!(interp.execute("host-object 'ghost'").value, Value::None);
}

// === Import ===

#[test]
fn modules_execute_once_and_cache() {
    let interp = Interpreter::new();
    let modules = Rc::new(CountingModules {
        loads: RefCell::new(0),
    });
    interp.set_module_source(Rc::clone(&modules) as Rc<dyn ModuleSource>);
    assert_eq!(interp.execute("m: import `answers\nm.answer").value, Value::Int(42));
    assert_eq!(interp.execute("n: import `answers\nn.answer").value, Value::Int(42));
    assert_eq!(*modules.loads.borrow(), 1, "second import hits the cache");
}

#[test]
fn import_without_a_source_is_unimplemented() {
    let interp = Interpreter::new();
    assert_eq!(interp.execute("import `anything").error_status, Some(501));
}

// === Print ===

#[test]
fn print_writes_through_the_host_writer() {
    let interp = Interpreter::new();
    let sink = SharedPrint::default();
    interp.set_print_writer(sink.clone());
    interp.execute("print 'x' 1");
    assert_eq!(&*sink.0.borrow(), "x 1\n");
}

// === Resource limits ===

#[test]
fn operation_limits_stop_runaway_top_level_loops() {
    let interp = Interpreter::new();
    interp.set_resource_tracker(LimitedTracker::new(Some(10_000), None));
    let result = interp.execute("loop [ none ]");
    assert_eq!(result.error_status, Some(500));
    assert!(result.error_message.unwrap().contains("operation limit"));
}

#[test]
fn call_depth_is_bounded() {
    let interp = Interpreter::new();
    interp.set_resource_tracker(LimitedTracker::new(None, None).with_max_depth(50));
    let result = interp.execute("f: fn {} [ call f ]\ncall f");
    assert_eq!(result.error_status, Some(500));
    assert!(result.error_message.unwrap().contains("call depth"));
}
