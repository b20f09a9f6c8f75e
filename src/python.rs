//! Python bindings for praatfan_bridge using PyO3.
//!
//! The module offers the usual `praat` scripting interface: `call` and `run`
//! take objects, a command name or script, and positional arguments.
//! Engine errors become `PraatError`, caught crashes `PraatFatal`, and
//! warnings go through Python's `warnings` machinery as `PraatWarning`, so
//! `warnings.catch_warnings` and `-W error` behave as usual.
//!
//! # Usage from Python
//!
//! ```python
//! import praatfan_bridge as praat
//!
//! sound = praat.read("audio.wav")
//! pitch = praat.call(sound, "To Pitch", 0.0, 75.0, 600.0)
//! mean = praat.call(pitch, "Get mean", 0, 0, "Hertz")
//!
//! objects, output = praat.run(
//!     [sound], 'n = Get number of samples\nwriteInfo: n',
//!     capture_output=True)
//! ```
//!
//! # Building
//!
//! ```bash
//! # Install maturin
//! pip install maturin
//!
//! # Build and install
//! maturin develop --features python
//! ```

use std::path::PathBuf;

use numpy::{PyArray1, PyArray2, PyArrayMethods};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use pyo3::exceptions::{PyException, PyTypeError, PyUserWarning, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyComplex, PyDict, PyList, PyString, PyTuple};

use crate::error::Error;
use crate::objects::Handle;
use crate::praat::{CallOptions, Praat, RunOptions, RunResult};
use crate::value::{Outcome, Value};

pyo3::create_exception!(praatfan_bridge, PraatError, PyException, "An error reported by the engine.");
pyo3::create_exception!(praatfan_bridge, PraatWarning, PyUserWarning, "A warning issued by the engine.");
pyo3::create_exception!(
    praatfan_bridge,
    PraatFatal,
    PyException,
    "The engine crashed; restart before further analysis."
);

static SESSION: Lazy<Mutex<Praat>> = Lazy::new(|| {
    let praat = Praat::from_env().unwrap_or_else(|e| {
        log::warn!("ignoring environment configuration: {}", e);
        Praat::new()
    });
    Mutex::new(praat)
});

fn to_py_err(error: Error) -> PyErr {
    match error {
        Error::Praat(message) => PraatError::new_err(message),
        Error::Warning(message) => PraatWarning::new_err(message),
        e @ Error::Crash { .. } => PraatFatal::new_err(e.to_string()),
        Error::ArgumentConversion(kind) => PyValueError::new_err(format!(
            "Cannot convert argument \"{}\" to a known Praat argument type",
            kind
        )),
        other => PraatError::new_err(other.to_string()),
    }
}

/// Run `f` on the session, then replay its warnings through Python.
fn with_session<T>(py: Python<'_>, f: impl FnOnce(&mut Praat) -> crate::Result<T>) -> PyResult<T> {
    let (result, warnings) = {
        let mut praat = SESSION.lock();
        let result = f(&mut praat);
        (result, praat.take_warnings())
    };
    let category = py.get_type_bound::<PraatWarning>();
    for warning in warnings {
        PyErr::warn_bound(py, category.as_any(), warning.message(), 1)?;
    }
    result.map_err(to_py_err)
}

// ============================================================================
// Objects
// ============================================================================

/// An object owned by the engine session.
#[pyclass(name = "PraatObject", module = "praatfan_bridge")]
pub struct PyPraatObject {
    handle: Handle,
}

#[pymethods]
impl PyPraatObject {
    /// The object's name, or None.
    #[getter]
    fn name(&self) -> PyResult<Option<String>> {
        let praat = SESSION.lock();
        let thing = praat.get(self.handle).map_err(to_py_err)?;
        Ok(thing.name().map(str::to_string))
    }

    #[setter]
    fn set_name(&self, name: Option<&str>) -> PyResult<()> {
        SESSION.lock().set_name(self.handle, name).map_err(to_py_err)
    }

    /// The class name, e.g. "Sound".
    #[getter]
    fn class_name(&self) -> PyResult<&'static str> {
        let praat = SESSION.lock();
        Ok(praat.get(self.handle).map_err(to_py_err)?.class().name())
    }

    /// The info text Praat shows for this object.
    fn info(&self) -> PyResult<String> {
        SESSION.lock().info(self.handle).map_err(to_py_err)
    }

    fn __repr__(&self) -> String {
        match SESSION.lock().full_name(self.handle) {
            Ok(name) => format!("<PraatObject {}>", name),
            Err(_) => "<PraatObject (removed)>".to_string(),
        }
    }
}

impl Drop for PyPraatObject {
    fn drop(&mut self) {
        match SESSION.try_lock() {
            Some(mut praat) => {
                // Already gone if a script removed it.
                let _ = praat.remove(self.handle);
            }
            None => log::warn!("session busy; leaking object {}", self.handle),
        }
    }
}

fn wrap(py: Python<'_>, handle: Handle) -> PyResult<PyObject> {
    Ok(Py::new(py, PyPraatObject { handle })?.into_py(py))
}

fn wrap_all(py: Python<'_>, handles: Vec<Handle>) -> PyResult<PyObject> {
    let objects = handles
        .into_iter()
        .map(|h| wrap(py, h))
        .collect::<PyResult<Vec<_>>>()?;
    Ok(PyList::new_bound(py, objects).into_py(py))
}

// ============================================================================
// Conversions
// ============================================================================

fn to_value(item: &Bound<'_, PyAny>) -> PyResult<Value> {
    if item.is_instance_of::<PyBool>() {
        return Ok(Value::Boolean(item.extract()?));
    }
    if let Ok(x) = item.extract::<f64>() {
        return Ok(Value::Number(x));
    }
    if item.is_instance_of::<PyString>() {
        return Ok(Value::String(item.extract()?));
    }
    if let Ok(array) = item.downcast::<PyArray1<f64>>() {
        return Ok(Value::Vector(array.readonly().as_array().to_owned()));
    }
    if let Ok(array) = item.downcast::<PyArray2<f64>>() {
        return Ok(Value::Matrix(array.readonly().as_array().to_owned()));
    }
    if let Ok(strings) = item.extract::<Vec<String>>() {
        return Ok(Value::StringVector(strings));
    }
    if let Ok(numbers) = item.extract::<Vec<f64>>() {
        return Ok(Value::from(numbers));
    }
    let kind = item.get_type().name().map(|n| n.to_string()).unwrap_or_default();
    Err(to_py_err(Error::ArgumentConversion(kind)))
}

fn from_outcome(py: Python<'_>, outcome: Outcome) -> PyResult<PyObject> {
    Ok(match outcome {
        Outcome::None => py.None(),
        Outcome::Number(x) => x.into_py(py),
        Outcome::Integer(n) => n.into_py(py),
        Outcome::Boolean(b) => b.into_py(py),
        Outcome::Complex(z) => PyComplex::from_doubles_bound(py, z.re, z.im).into_py(py),
        Outcome::Vector(v) => PyArray1::from_owned_array_bound(py, v).into_py(py),
        Outcome::Matrix(m) => PyArray2::from_owned_array_bound(py, m).into_py(py),
        Outcome::StringVector(s) => s.into_py(py),
        Outcome::Text(s) => s.into_py(py),
        Outcome::Object(h) => wrap(py, h)?,
        Outcome::Objects(list) => wrap_all(py, list)?,
    })
}

fn from_value(py: Python<'_>, value: Value) -> PyObject {
    match value {
        Value::Number(x) => x.into_py(py),
        Value::Boolean(b) => b.into_py(py),
        Value::String(s) => s.into_py(py),
        Value::Vector(v) => PyArray1::from_owned_array_bound(py, v).into_py(py),
        Value::Matrix(m) => PyArray2::from_owned_array_bound(py, m).into_py(py),
        Value::StringVector(s) => s.into_py(py),
    }
}

/// Leading objects (single, or a list), then the remaining arguments.
fn split_objects<'py>(args: &Bound<'py, PyTuple>) -> PyResult<(Vec<Handle>, Vec<Bound<'py, PyAny>>)> {
    let mut handles = Vec::new();
    let mut rest = Vec::new();
    let mut leading = true;
    for item in args.iter() {
        if leading {
            if let Ok(object) = item.downcast::<PyPraatObject>() {
                handles.push(object.borrow().handle);
                continue;
            }
            if let Ok(list) = item.extract::<Vec<PyRef<'_, PyPraatObject>>>() {
                handles.extend(list.iter().map(|o| o.handle));
                continue;
            }
            leading = false;
        }
        rest.push(item);
    }
    Ok((handles, rest))
}

fn object_list(value: Option<Bound<'_, PyAny>>) -> PyResult<Vec<Handle>> {
    match value {
        None => Ok(Vec::new()),
        Some(value) => {
            let list: Vec<PyRef<'_, PyPraatObject>> = value.extract()?;
            Ok(list.iter().map(|o| o.handle).collect())
        }
    }
}

fn flag(kwargs: Option<&Bound<'_, PyDict>>, key: &str) -> PyResult<bool> {
    match kwargs.map(|k| k.get_item(key)).transpose()?.flatten() {
        Some(value) => value.extract(),
        None => Ok(false),
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Read a file and return the object(s) it holds.
#[pyfunction]
fn read(py: Python<'_>, path: PathBuf) -> PyResult<PyObject> {
    let handles = with_session(py, |praat| praat.read_all(&path))?;
    if handles.len() == 1 {
        wrap(py, handles[0])
    } else {
        wrap_all(py, handles)
    }
}

/// call(*objects, command, *args, return_string=False)
///
/// Run a Praat command on the given objects.
#[pyfunction]
#[pyo3(signature = (*args, **kwargs))]
fn call(py: Python<'_>, args: &Bound<'_, PyTuple>, kwargs: Option<&Bound<'_, PyDict>>) -> PyResult<PyObject> {
    let (objects, rest) = split_objects(args)?;
    let (name, rest) = rest
        .split_first()
        .ok_or_else(|| PyTypeError::new_err("call() needs a command name"))?;
    let name: String = name.extract()?;
    let values = rest.iter().map(to_value).collect::<PyResult<Vec<_>>>()?;
    let options = CallOptions {
        return_string: flag(kwargs, "return_string")?,
    };
    let outcome = with_session(py, |praat| praat.call_with(&objects, &name, &values, &options))?;
    from_outcome(py, outcome)
}

fn run_options(kwargs: Option<&Bound<'_, PyDict>>) -> PyResult<RunOptions> {
    let extra = kwargs.map(|k| k.get_item("extra_objects")).transpose()?.flatten();
    Ok(RunOptions {
        capture_output: flag(kwargs, "capture_output")?,
        return_variables: flag(kwargs, "return_variables")?,
        use_defaults: flag(kwargs, "use_defaults")?,
        extra_objects: object_list(extra)?,
        keep_cwd: flag(kwargs, "keep_cwd")?,
    })
}

/// Objects, then output and variables when they were asked for.
fn run_result(py: Python<'_>, result: RunResult) -> PyResult<PyObject> {
    let mut parts = vec![wrap_all(py, result.objects)?];
    if let Some(output) = result.output {
        parts.push(output.into_py(py));
    }
    if let Some(variables) = result.variables {
        let dict = PyDict::new_bound(py);
        for (name, value) in variables {
            dict.set_item(name, from_value(py, value))?;
        }
        parts.push(dict.into_py(py));
    }
    if parts.len() == 1 {
        Ok(parts.remove(0))
    } else {
        Ok(PyTuple::new_bound(py, parts).into_py(py))
    }
}

/// run(*objects, script, *args, capture_output=False,
/// return_variables=False, extra_objects=None)
///
/// Run Praat script source.
#[pyfunction]
#[pyo3(signature = (*args, **kwargs))]
fn run(py: Python<'_>, args: &Bound<'_, PyTuple>, kwargs: Option<&Bound<'_, PyDict>>) -> PyResult<PyObject> {
    let (objects, rest) = split_objects(args)?;
    let (script, rest) = rest
        .split_first()
        .ok_or_else(|| PyTypeError::new_err("run() needs a script"))?;
    let script: String = script.extract()?;
    let values = rest.iter().map(to_value).collect::<PyResult<Vec<_>>>()?;
    let options = run_options(kwargs)?;
    let result = with_session(py, |praat| praat.run_with(&objects, &script, &values, &options))?;
    run_result(py, result)
}

/// run_file(*objects, path, *args, keep_cwd=False, ...)
///
/// Run a Praat script file.
#[pyfunction]
#[pyo3(signature = (*args, **kwargs))]
fn run_file(py: Python<'_>, args: &Bound<'_, PyTuple>, kwargs: Option<&Bound<'_, PyDict>>) -> PyResult<PyObject> {
    let (objects, rest) = split_objects(args)?;
    let (path, rest) = rest
        .split_first()
        .ok_or_else(|| PyTypeError::new_err("run_file() needs a path"))?;
    let path: PathBuf = path.extract()?;
    let values = rest.iter().map(to_value).collect::<PyResult<Vec<_>>>()?;
    let options = run_options(kwargs)?;
    let result = with_session(py, |praat| praat.run_file(&objects, &path, &values, &options))?;
    run_result(py, result)
}

// ============================================================================
// Module
// ============================================================================

#[pymodule]
fn praatfan_bridge(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();
    m.add_class::<PyPraatObject>()?;
    m.add_function(wrap_pyfunction!(read, m)?)?;
    m.add_function(wrap_pyfunction!(call, m)?)?;
    m.add_function(wrap_pyfunction!(run, m)?)?;
    m.add_function(wrap_pyfunction!(run_file, m)?)?;
    m.add("PraatError", py.get_type_bound::<PraatError>())?;
    m.add("PraatWarning", py.get_type_bound::<PraatWarning>())?;
    m.add("PraatFatal", py.get_type_bound::<PraatFatal>())?;

    // Add version info
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
