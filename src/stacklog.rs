//! Framed stack-sample log read/write.
//!
//! The log is a repeating sequence of records: a line holding the capture
//! time as base-10 unix nanoseconds, the raw stack dump, and a line starting
//! with `-` closing the record. A record with no dump lines is a valid empty
//! capture.

use thiserror::Error;

use std::io::{BufRead, Write};

use crate::{Goroutine, StackscopeError, parse_stack_dump};

/// One timestamped capture of every goroutine's stack.
#[derive(Debug, Clone)]
pub struct StackSample {
    pub time_ns: i64,
    pub goroutines: Vec<Goroutine>,
}

/// A read that failed partway: `samples` holds everything parsed before the
/// failure so callers can diagnose the log, or proceed with partial data.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ReadFailure {
    pub samples: Vec<StackSample>,
    pub error: StackscopeError,
}

/// Appends one framed record. The dump body is newline-terminated before the
/// closing delimiter so the framing survives bodies without a trailing newline.
pub fn write_record<W: Write>(w: &mut W, timestamp_ns: i64, dump: &str) -> std::io::Result<()> {
    writeln!(w, "{timestamp_ns}")?;
    if !dump.is_empty() {
        w.write_all(dump.as_bytes())?;
        if !dump.ends_with('\n') {
            w.write_all(b"\n")?;
        }
    }
    w.write_all(b"-\n")?;
    Ok(())
}

/// Reads every record from a stack log.
pub fn read_samples<R: BufRead>(reader: R) -> Result<Vec<StackSample>, ReadFailure> {
    let mut samples = Vec::new();
    let mut in_record = false;
    let mut time_ns = 0i64;
    let mut body = String::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(err) => return Err(fail(samples, err.into())),
        };
        if !in_record {
            time_ns = match line.trim().parse::<i64>() {
                Ok(ns) => ns,
                Err(_) => {
                    return Err(fail(
                        samples,
                        StackscopeError::Timestamp {
                            line: idx + 1,
                            text: line,
                        },
                    ));
                }
            };
            in_record = true;
            body.clear();
            continue;
        }
        if line.starts_with('-') {
            in_record = false;
            let goroutines = match parse_stack_dump(&body) {
                Ok(gs) => gs,
                Err(err) => {
                    return Err(fail(
                        samples,
                        StackscopeError::Dump {
                            line: idx + 1,
                            timestamp_ns: time_ns,
                            message: err.to_string(),
                        },
                    ));
                }
            };
            samples.push(StackSample {
                time_ns,
                goroutines,
            });
            continue;
        }
        body.push_str(&line);
        body.push('\n');
    }

    Ok(samples)
}

fn fail(samples: Vec<StackSample>, error: StackscopeError) -> ReadFailure {
    ReadFailure { samples, error }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "goroutine 1 [running]:\n\
main.calcPI(0x1, 0x2)\n\
\t/app/main.go:17 +0x5e\n";

    #[test]
    fn round_trips_records_through_the_framing() {
        let mut buf = Vec::new();
        write_record(&mut buf, 100, DUMP).expect("write");
        write_record(&mut buf, 200, DUMP).expect("write");

        let samples = read_samples(buf.as_slice()).expect("read");
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].time_ns, 100);
        assert_eq!(samples[1].time_ns, 200);
        assert_eq!(samples[0].goroutines.len(), 1);
        assert_eq!(samples[0].goroutines[0].stack[0].name, "main.calcPI");
    }

    #[test]
    fn empty_capture_is_a_valid_record() {
        let mut buf = Vec::new();
        write_record(&mut buf, 42, "").expect("write");
        let samples = read_samples(buf.as_slice()).expect("read");
        assert_eq!(samples.len(), 1);
        assert!(samples[0].goroutines.is_empty());
    }

    #[test]
    fn unterminated_dump_body_gets_newline() {
        let mut buf = Vec::new();
        write_record(&mut buf, 7, "goroutine 3 [select]:").expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.ends_with("goroutine 3 [select]:\n-\n"));
    }

    #[test]
    fn invalid_timestamp_keeps_prior_samples() {
        let mut buf = Vec::new();
        write_record(&mut buf, 100, DUMP).expect("write");
        buf.extend_from_slice(b"not-a-number\n");

        let failure = read_samples(buf.as_slice()).expect_err("must fail");
        assert_eq!(failure.samples.len(), 1);
        let msg = failure.error.to_string();
        assert!(msg.contains("not-a-number"), "{msg}");
        assert!(msg.contains("line 6"), "{msg}");
    }

    #[test]
    fn bad_dump_names_record_timestamp() {
        let mut buf = Vec::new();
        write_record(&mut buf, 100, DUMP).expect("write");
        write_record(&mut buf, 250, "this is not a goroutine dump").expect("write");

        let failure = read_samples(buf.as_slice()).expect_err("must fail");
        assert_eq!(failure.samples.len(), 1);
        let msg = failure.error.to_string();
        assert!(msg.contains("250"), "{msg}");
    }
}
