use std::io::Write;

use serde::Serialize;

use crate::{
    error::Result,
    record::{MergedResult, Summary},
};

/// Receives the merged, ordered output of a run.
pub trait ResultSink {
    fn emit(&mut self, result: &MergedResult) -> Result<()>;

    fn summary(&mut self, summary: &Summary) -> Result<()>;
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn emit(&mut self, result: &MergedResult) -> Result<()> {
        (**self).emit(result)
    }

    fn summary(&mut self, summary: &Summary) -> Result<()> {
        (**self).summary(summary)
    }
}

/// Human readable lines, one per result.
pub struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ResultSink for TextSink<W> {
    fn emit(&mut self, result: &MergedResult) -> Result<()> {
        match result {
            MergedResult::Square(r) => writeln!(
                self.out,
                "[{}] {} x {} = {}",
                r.created, r.number, r.number, r.square
            )?,
            MergedResult::Primality(r) => writeln!(
                self.out,
                "[{}] {} is {}",
                r.created,
                r.number,
                if r.is_prime { "prime" } else { "not prime" }
            )?,
        }

        Ok(())
    }

    fn summary(&mut self, summary: &Summary) -> Result<()> {
        writeln!(
            self.out,
            "[{}] Finished reading the file, {} numbers read",
            summary.created, summary.total
        )?;
        self.out.flush()?;

        Ok(())
    }
}

#[derive(Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
enum JsonLine<'a> {
    Summary(&'a Summary),
}

/// One JSON object per line.
pub struct JsonSink<W: Write> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ResultSink for JsonSink<W> {
    fn emit(&mut self, result: &MergedResult) -> Result<()> {
        serde_json::to_writer(&mut self.out, result)?;
        self.out.write_all(b"\n")?;

        Ok(())
    }

    fn summary(&mut self, summary: &Summary) -> Result<()> {
        serde_json::to_writer(&mut self.out, &JsonLine::Summary(summary))?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;

        Ok(())
    }
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    pub results: Vec<MergedResult>,
    pub summaries: Vec<Summary>,
}

impl ResultSink for VecSink {
    fn emit(&mut self, result: &MergedResult) -> Result<()> {
        self.results.push(*result);
        Ok(())
    }

    fn summary(&mut self, summary: &Summary) -> Result<()> {
        self.summaries.push(*summary);
        Ok(())
    }
}
