use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;

/// Output sink selection for `hash`/`dup`: a file when `-o/--output` is
/// given, stdout otherwise.
pub enum Sink {
    File(BufWriter<File>),
    Stdout(Stdout),
}

impl Sink {
    pub fn open(path: Option<&Path>) -> io::Result<Self> {
        match path {
            Some(path) => Ok(Sink::File(BufWriter::new(File::create(path)?))),
            None => Ok(Sink::Stdout(io::stdout())),
        }
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::File(w) => w.write(buf),
            Sink::Stdout(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::File(w) => w.flush(),
            Sink::Stdout(w) => w.flush(),
        }
    }
}
