//! Parser for the Go runtime traceback text format.
//!
//! Consumes the output of `runtime.Stack(buf, true)` (also served by pprof as
//! `/debug/pprof/goroutine?debug=2`) and produces structured per-goroutine
//! call stacks. Frame identity is purely syntactic; there is no symbol or PC
//! information beyond what the text carries.

use serde::{Deserialize, Serialize};

use crate::{StackscopeError, StackscopeResult};

/// Literal argument values captured for one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Args {
    pub values: Vec<String>,
    pub elided: bool,
}

/// One call frame: `name` is the `pkg.Func` form (the portion of the symbol
/// after the final `/`), `package` the base package name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub name: String,
    pub package: String,
    pub args: Args,
    pub src_path: String,
    pub line: u32,
}

impl Call {
    /// True when the final name segment starts with an uppercase ASCII
    /// letter, e.g. `http.(*Transport).RoundTrip` but not `poll.runtime_pollWait`.
    pub fn is_exported(&self) -> bool {
        self.name
            .rsplit('.')
            .next()
            .and_then(|seg| seg.chars().next())
            .is_some_and(|c| c.is_ascii_uppercase())
    }

    /// Standard-library heuristic: the frame's source file lives under the Go
    /// toolchain install layout. A dump carries no GOROOT metadata, so the
    /// path text is all there is to go on.
    pub fn is_stdlib(&self) -> bool {
        self.src_path.contains("/go/src/")
    }
}

/// One goroutine from a dump. `stack[0]` is the innermost (top) frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goroutine {
    pub id: u64,
    pub state: String,
    pub created_by: Option<Call>,
    pub stack: Vec<Call>,
}

/// Parses a full stack dump into its goroutines.
pub fn parse_stack_dump(raw: &str) -> StackscopeResult<Vec<Goroutine>> {
    let mut goroutines = Vec::new();
    let mut lines = raw.lines().enumerate().peekable();

    while let Some((idx, line)) = lines.next() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with(['\t', ' ']) {
            return Err(parse_error(idx, line, "orphaned source location line"));
        }
        if !line.starts_with("goroutine ") {
            return Err(parse_error(idx, line, "expected goroutine header"));
        }
        let (id, state) = parse_header(idx, line)?;
        let mut g = Goroutine {
            id,
            state,
            created_by: None,
            stack: Vec::new(),
        };

        while let Some((_, next)) = lines.peek() {
            if next.trim().is_empty() || next.starts_with("goroutine ") {
                break;
            }
            let Some((idx, line)) = lines.next() else {
                break;
            };
            if line.starts_with("...") {
                // `...additional frames elided...` marker; nothing to record.
                continue;
            }
            if let Some(rest) = line.strip_prefix("created by ") {
                let raw_func = rest.split(" in goroutine ").next().unwrap_or(rest);
                let (src_path, src_line) = take_location(&mut lines);
                g.created_by = Some(make_call(idx, raw_func.trim(), Args::default(), src_path, src_line)?);
                continue;
            }
            let (raw_func, args) = parse_func_line(idx, line)?;
            let Some((_, loc)) = lines.peek() else {
                return Err(parse_error(idx, line, "frame has no source location line"));
            };
            if !loc.starts_with(['\t', ' ']) {
                return Err(parse_error(idx, line, "frame has no source location line"));
            }
            let (src_path, src_line) = take_location(&mut lines);
            g.stack.push(make_call(idx, &raw_func, args, src_path, src_line)?);
        }

        goroutines.push(g);
    }

    Ok(goroutines)
}

fn parse_header(idx: usize, line: &str) -> StackscopeResult<(u64, String)> {
    let rest = line
        .strip_prefix("goroutine ")
        .and_then(|r| r.strip_suffix(':'))
        .ok_or_else(|| parse_error(idx, line, "malformed goroutine header"))?;
    let id = rest
        .split_whitespace()
        .next()
        .and_then(|tok| tok.parse::<u64>().ok())
        .ok_or_else(|| parse_error(idx, line, "malformed goroutine id"))?;
    let state = match (rest.find('['), rest.rfind(']')) {
        (Some(open), Some(close)) if open < close => rest[open + 1..close].to_string(),
        _ => return Err(parse_error(idx, line, "missing goroutine state")),
    };
    Ok((id, state))
}

fn parse_func_line(idx: usize, line: &str) -> StackscopeResult<(String, Args)> {
    let line = line.trim_end();
    let Some(open) = line.rfind('(') else {
        return Ok((line.to_string(), Args::default()));
    };
    let Some(close) = line[open..].find(')') else {
        return Err(parse_error(idx, line, "unterminated argument list"));
    };
    let raw_func = line[..open].to_string();
    let inner = &line[open + 1..open + close];
    let mut args = Args::default();
    for value in inner.split(',').map(str::trim).filter(|v| !v.is_empty()) {
        if value == "..." {
            args.elided = true;
        } else {
            args.values.push(value.to_string());
        }
    }
    Ok((raw_func, args))
}

/// Consumes the tab-indented `path/file.go:123 +0x5e` line if present.
fn take_location<'a, I>(lines: &mut std::iter::Peekable<I>) -> (String, u32)
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let Some((_, line)) = lines.peek() else {
        return (String::new(), 0);
    };
    if !line.starts_with(['\t', ' ']) {
        return (String::new(), 0);
    }
    let text = line.trim().to_string();
    lines.next();
    let text = text.split(" +0x").next().unwrap_or(&text);
    match text.rsplit_once(':') {
        Some((path, num)) => {
            let line_no = num.parse().unwrap_or(0);
            (path.to_string(), line_no)
        }
        None => (text.to_string(), 0),
    }
}

fn make_call(
    idx: usize,
    raw_func: &str,
    args: Args,
    src_path: String,
    line: u32,
) -> StackscopeResult<Call> {
    let tail = raw_func.rsplit('/').next().unwrap_or(raw_func);
    if tail.is_empty() {
        return Err(parse_error(idx, raw_func, "empty function symbol"));
    }
    let (mut package, func) = match tail.split_once('.') {
        Some((pkg, func)) => (pkg.to_string(), func.to_string()),
        None => (tail.to_string(), String::new()),
    };
    // Module major-version path segments (`.../klog/v2.init.0`) name the
    // package after the segment preceding the version.
    if is_version_segment(&package) {
        if let Some(prev) = raw_func.rsplit('/').nth(1) {
            package = prev.to_string();
        }
    }
    let name = if func.is_empty() {
        package.clone()
    } else {
        format!("{package}.{func}")
    };
    Ok(Call {
        name,
        package,
        args,
        src_path,
        line,
    })
}

fn is_version_segment(seg: &str) -> bool {
    seg.len() > 1
        && seg.starts_with('v')
        && seg[1..].chars().all(|c| c.is_ascii_digit())
}

fn parse_error(idx: usize, line: &str, reason: &str) -> StackscopeError {
    StackscopeError::StackParse(format!("line {}: {reason}: {line:?}", idx + 1))
}
