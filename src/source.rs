use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use log::{debug, warn};

use crate::error::{PipelineError, Result};

/// Whitespace-delimited 32-bit integers read from text.
///
/// Iteration ends at end of input or at the first token that is not a valid
/// `i32`; everything after that token is ignored. An I/O error is yielded
/// once and also ends iteration.
pub struct NumberReader<R> {
    reader: R,
    line: String,
    pos: usize,
    line_no: usize,
    stopped: bool,
}

impl<R: BufRead> NumberReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            pos: 0,
            line_no: 0,
            stopped: false,
        }
    }
}

/// Opens `path` for reading. Failing here is a startup error: no item has
/// been produced yet.
pub fn open(path: &Path) -> Result<NumberReader<BufReader<File>>> {
    let file = File::open(path).map_err(|source| PipelineError::OpenSource {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("reading numbers from {}", path.display());

    Ok(NumberReader::new(BufReader::new(file)))
}

impl<R: BufRead> Iterator for NumberReader<R> {
    type Item = Result<i32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped {
            return None;
        }

        loop {
            let rest = self.line[self.pos..].trim_start();

            if !rest.is_empty() {
                let start = self.line.len() - rest.len();
                let end = rest
                    .find(char::is_whitespace)
                    .map_or(self.line.len(), |i| start + i);
                self.pos = end;

                let token = &self.line[start..end];
                return match token.parse::<i32>() {
                    Ok(number) => Some(Ok(number)),
                    Err(e) => {
                        warn!(
                            "line {}: stopping at {:?}, not a 32-bit integer ({})",
                            self.line_no, token, e
                        );
                        self.stopped = true;
                        None
                    }
                };
            }

            self.line.clear();
            self.pos = 0;

            match self.reader.read_line(&mut self.line) {
                Ok(0) => {
                    self.stopped = true;
                    return None;
                }
                Ok(_) => self.line_no += 1,
                Err(e) => {
                    self.stopped = true;
                    return Some(Err(PipelineError::ReadSource(e)));
                }
            }
        }
    }
}
