use std::cell::RefCell;
use std::io::{self, Write};
use std::ops::ControlFlow;

/// What a requested stream will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskMode {
    Extract,
    /// The data is only decoded and checked.
    Test,
}

/// Outcome of a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    Ok,
    /// The folder containing the file could not be decoded.
    DataError,
    /// The file's data doesn't match its stored CRC.
    CrcError,
    /// No decoder is available for a method of the file's folder.
    Unsupported,
}

/// The caller's side of an extraction.
pub trait ExtractCallback {
    /// Number of bytes the run is going to write out.
    fn set_total(&mut self, _total: u64) {}

    /// Number of bytes written out so far. Breaking cancels the extraction.
    fn set_completed(&mut self, _completed: u64) -> ControlFlow<()> {
        return ControlFlow::Continue(());
    }

    /// A sink for the file's data, or `None` to let the data be dropped.
    fn get_stream(&mut self, file_index: usize, mode: AskMode) -> io::Result<Option<Box<dyn Write>>>;

    /// Called exactly once for every requested file.
    fn set_operation_result(&mut self, file_index: usize, result: OperationResult);
}

/// Lets the splitter and the progress reporting of a job take turns on the callback.
pub(crate) struct CallbackCell<'a> {
    inner: RefCell<&'a mut dyn ExtractCallback>,
}

impl<'a> CallbackCell<'a> {
    pub(crate) fn new(callback: &'a mut dyn ExtractCallback) -> CallbackCell<'a> {
        return CallbackCell {
            inner: RefCell::new(callback),
        };
    }

    pub(crate) fn with<T, F>(&self, f: F) -> io::Result<T>
    where
        F: FnOnce(&mut (dyn ExtractCallback + 'a)) -> T,
    {
        let mut callback = self
            .inner
            .try_borrow_mut()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "extract callback re-entered"))?;
        return Ok(f(&mut **callback));
    }
}
