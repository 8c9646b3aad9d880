use std::{
    ffi::OsString,
    io::{self, BufRead, BufReader, Read, Write},
    os::unix::process::CommandExt,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, warn};
use wait_timeout::ChildExt;

use crate::error::ClassifyError;

/// How long output is still collected once the classifier has been reaped.
/// Descendants that escaped the process group may hold the pipe open.
const OUTPUT_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Clean,
    Suspicious {
        /// Non-zero exit status reported by the classifier.
        status: i32,
    },
}

/// Judges one file. Free-form text produced while judging goes to `output`,
/// which is shared with every other classification of the same run.
pub trait Classifier: Send + Sync {
    fn classify(&self, path: &Path, output: &Sender<String>) -> Result<Verdict, ClassifyError>;
}

impl<F> Classifier for F
where
    F: Fn(&Path) -> Result<Verdict, ClassifyError> + Send + Sync,
{
    fn classify(&self, path: &Path, _output: &Sender<String>) -> Result<Verdict, ClassifyError> {
        self(path)
    }
}

/// Runs `<program> [args...] <file>` and maps exit status 0 to clean and
/// anything else to suspicious. Standard output is forwarded line by line.
#[derive(Debug, Clone)]
pub struct ExternalClassifier {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Option<Duration>,
}

impl ExternalClassifier {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Arguments placed before the file path.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Kill the classifier if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn wait(&self, child: &mut Child, path: &Path) -> Result<Verdict, ClassifyError> {
        let wait_err = |source| ClassifyError::Wait {
            path: path.to_path_buf(),
            source,
        };

        let status = match self.timeout {
            None => child.wait().map_err(wait_err)?,
            Some(limit) => match child.wait_timeout(limit).map_err(wait_err)? {
                Some(status) => status,
                None => {
                    warn!("[classify] {:?} exceeded {:?}, killing classifier", path, limit);
                    kill_group(child);
                    let _ = child.wait();
                    return Err(ClassifyError::TimedOut {
                        path: path.to_path_buf(),
                        timeout: limit,
                    });
                }
            },
        };

        match status.code() {
            Some(0) => Ok(Verdict::Clean),
            Some(code) => Ok(Verdict::Suspicious { status: code }),
            None => Err(ClassifyError::Terminated {
                path: path.to_path_buf(),
            }),
        }
    }
}

impl Classifier for ExternalClassifier {
    fn classify(&self, path: &Path, output: &Sender<String>) -> Result<Verdict, ClassifyError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .process_group(0)
            .spawn()
            .map_err(|source| ClassifyError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        debug!("[classify] started {:?} on {:?}", self.program, path);

        // The reader is detached: a leftover descendant may keep the pipe
        // open long after the classifier is gone. It only holds a private
        // sender, so the shared channel can still close.
        let (line_tx, line_rx) = channel::unbounded::<String>();
        if let Some(out) = child.stdout.take() {
            thread::spawn(move || forward_lines(out, &line_tx));
        }

        let (done_tx, done_rx) = channel::bounded::<()>(0);
        thread::scope(|s| {
            s.spawn(move || relay_lines(&line_rx, &done_rx, output));
            let verdict = self.wait(&mut child, path);
            drop(done_tx);
            verdict
        })
    }
}

/// SIGKILL the classifier's whole process group, so children it started
/// die with it.
fn kill_group(child: &mut Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    // SAFETY: killpg only sends a signal; the group was created at spawn and
    // the leader is not reaped yet, so the id cannot have been reused.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(
            "[classify] killpg({pgid}) failed: {}",
            io::Error::last_os_error()
        );
        let _ = child.kill();
    }
}

/// Read lines from `out` until EOF or until nobody is listening.
fn forward_lines(out: impl Read, lines: &Sender<String>) {
    for line in BufReader::new(out).lines() {
        match line {
            Ok(line) => {
                if lines.send(line).is_err() {
                    return;
                }
            }
            Err(e) => {
                debug!("[classify] stopped reading classifier output: {e}");
                return;
            }
        }
    }
}

/// Move lines onto the shared channel while the classifier runs, then for
/// at most `OUTPUT_GRACE` after it has been reaped.
fn relay_lines(lines: &Receiver<String>, done: &Receiver<()>, output: &Sender<String>) {
    loop {
        crossbeam::select! {
            recv(lines) -> line => match line {
                Ok(line) => {
                    if output.send(line).is_err() {
                        return;
                    }
                }
                Err(_) => return,
            },
            recv(done) -> _ => break,
        }
    }

    let deadline = Instant::now() + OUTPUT_GRACE;
    while let Ok(line) = lines.recv_deadline(deadline) {
        if output.send(line).is_err() {
            return;
        }
    }
}

/// Single reader of the shared classifier output channel.
pub struct OutputDrain<W> {
    handle: thread::JoinHandle<io::Result<W>>,
}

impl<W> OutputDrain<W> {
    /// Wait until every sender has been dropped and all lines are written.
    pub fn finish(self) -> io::Result<W> {
        self.handle
            .join()
            .map_err(|_| io::Error::other("classifier output drain panicked"))?
    }
}

/// Open the write-many, read-once channel that classifier output is merged
/// onto. The drain thread ends when the last `Sender` clone is dropped.
pub fn output_channel<W>(mut sink: W) -> (Sender<String>, OutputDrain<W>)
where
    W: Write + Send + 'static,
{
    let (tx, rx) = channel::unbounded::<String>();
    let handle = thread::spawn(move || {
        for line in rx {
            writeln!(sink, "{line}")?;
        }
        sink.flush()?;
        Ok(sink)
    });

    (tx, OutputDrain { handle })
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
