//! Descriptor redirection through a pipe
//!
//! `StreamRedirect` owns a duplicate of the original descriptor for as long as
//! the redirection is active and puts it back on `stop` or on drop.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::io::{FromRawFd, RawFd};
use std::thread::{self, JoinHandle};

use super::line_splitter::LineSplitter;

/// Receives every completed line read from the pipe
pub(crate) type LineSink = Box<dyn FnMut(String) + Send>;

pub(crate) struct StreamRedirect {
    target: RawFd,
    saved: RawFd,
    restored: bool,
    reader: Option<JoinHandle<()>>,
}

impl StreamRedirect {
    /// Point `target` at a fresh pipe and start reading it
    ///
    /// # Errors
    ///
    /// Returns the OS error if the pipe cannot be created, the descriptor
    /// cannot be duplicated, or the reader thread cannot be started. The
    /// original descriptor is left untouched in every failure case.
    pub(crate) fn start(target: RawFd, name: &str, sink: LineSink) -> io::Result<Self> {
        flush_buffered(target);

        let mut fds: [RawFd; 2] = [-1; 2];
        // SAFETY: fds points to two writable c_int slots
        cvt(unsafe { libc::pipe(fds.as_mut_ptr()) })?;
        let (read_fd, write_fd) = (fds[0], fds[1]);
        set_cloexec(read_fd);
        set_cloexec(write_fd);

        // SAFETY: target is a descriptor number; dup reports failure via -1
        let saved = match cvt(unsafe { libc::dup(target) }) {
            Ok(fd) => fd,
            Err(e) => {
                close_all(&[read_fd, write_fd]);
                return Err(e);
            }
        };
        set_cloexec(saved);

        // SAFETY: both descriptors are open
        if let Err(e) = cvt(unsafe { libc::dup2(write_fd, target) }) {
            close_all(&[read_fd, write_fd, saved]);
            return Err(e);
        }
        // target is now the only write end
        close_all(&[write_fd]);

        // SAFETY: read_fd is open and owned exclusively by this File from here on
        let pipe = unsafe { File::from_raw_fd(read_fd) };
        let mut redirect = Self {
            target,
            saved,
            restored: false,
            reader: None,
        };

        let reader = thread::Builder::new()
            .name(format!("xlfacility-capture-{}", name))
            .spawn(move || pump(pipe, sink));
        match reader {
            Ok(handle) => {
                redirect.reader = Some(handle);
                Ok(redirect)
            }
            Err(e) => {
                redirect.restore()?;
                Err(e)
            }
        }
    }

    /// The duplicate of the original destination
    pub(crate) fn saved_fd(&self) -> RawFd {
        self.saved
    }

    /// Restore the original destination and wait for the reader to drain
    ///
    /// # Errors
    ///
    /// Returns the OS error if `dup2` fails; the reader is still joined.
    pub(crate) fn stop(mut self) -> io::Result<()> {
        let restored = self.restore();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        restored
    }

    fn restore(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        flush_buffered(self.target);
        // SAFETY: saved is owned by this redirect and still open
        cvt(unsafe { libc::dup2(self.saved, self.target) })?;
        close_all(&[self.saved]);
        self.restored = true;
        Ok(())
    }
}

impl Drop for StreamRedirect {
    fn drop(&mut self) {
        // The reader exits by itself once the pipe reports end of file
        if let Err(e) = self.restore() {
            tracing::error!(fd = self.target, error = %e, "Failed restoring captured descriptor");
        }
    }
}

fn pump(mut pipe: File, mut sink: LineSink) {
    let mut splitter = LineSplitter::new();
    let mut buffer = [0u8; 4096];

    loop {
        match pipe.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                for line in splitter.push(&buffer[..n]) {
                    sink(line);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, "Stopped reading captured stream");
                break;
            }
        }
    }

    if let Some(line) = splitter.finish() {
        sink(line);
    }
}

/// Push out bytes Rust still buffers for the descriptor
fn flush_buffered(target: RawFd) {
    if target == libc::STDOUT_FILENO {
        let _ = io::stdout().flush();
    } else if target == libc::STDERR_FILENO {
        let _ = io::stderr().flush();
    }
}

fn set_cloexec(fd: RawFd) {
    // SAFETY: fcntl on an open descriptor; failures only lose the flag
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFD);
        if flags >= 0 {
            libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC);
        }
    }
}

fn close_all(fds: &[RawFd]) {
    for fd in fds {
        // SAFETY: each descriptor is owned by the caller and closed once
        unsafe {
            libc::close(*fd);
        }
    }
}

fn cvt(result: libc::c_int) -> io::Result<libc::c_int> {
    if result == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(result)
    }
}

/// Duplicate `fd` into an owned `File`
///
/// # Errors
///
/// Returns the OS error if `dup` fails.
pub(crate) fn duplicate(fd: RawFd) -> io::Result<File> {
    // SAFETY: dup reports failure via -1
    let copy = cvt(unsafe { libc::dup(fd) })?;
    set_cloexec(copy);
    // SAFETY: copy is a fresh descriptor owned only by this File
    Ok(unsafe { File::from_raw_fd(copy) })
}
