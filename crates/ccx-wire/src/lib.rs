// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! ccx-wire
//!
//! The request/response framing spoken between a command-server client and
//! the daemon over a UNIX domain socket. Deliberately synchronous and I/O
//! free: callers own the socket and just hand this crate bytes.
//!
//! A request is a single newline-terminated line: a JSON array of
//! `[env_map, cwd_string, arg0, arg1, ...]`, i.e. the invocation's
//! environment and working directory followed by its argv, all as one
//! flat positional array with no length prefix or version tag. File
//! descriptors for stdin/stdout/stderr travel separately, out of band,
//! over the same socket (see `ccx-pcs`).

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde_json::Value;

/// Everything the daemon needs to run a command exactly as the client
/// would have: the full invocation environment, the working directory,
/// and the argv the user typed (argv[0] is the companion binary name, not
/// the wrapped command).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub cwd: String,
    pub env: BTreeMap<String, String>,
    pub argv: Vec<String>,
}

impl Request {
    #[must_use]
    pub fn new(cwd: impl Into<String>, env: BTreeMap<String, String>, argv: Vec<String>) -> Self {
        Request {
            cwd: cwd.into(),
            env,
            argv,
        }
    }
}

/// The daemon's reply: the wrapped command's exit status. The PID the
/// worker ran it as is not carried here (unlike the format this was
/// ported from, which precedes the exit code with an 8-byte PID); nothing
/// on the client side keys off that PID, so it's dropped rather than
/// plumbed through for no reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub exit_code: i32,
}

/// Framing and (de)serialization failures.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("request line is not a JSON array")]
    NotAnArray,
    #[error("request array's first element is not an environment object")]
    BadEnv,
    #[error("request array's second element is not a cwd string")]
    BadCwd,
    #[error("request array element {0} is not an argv string")]
    BadArg(usize),
    #[error("request array has {0} elements, expected at least 2 (env and cwd)")]
    TooShort(usize),
    #[error("frame is missing its terminating newline")]
    Truncated,
}

/// Encode `request` as a single line: `[env, cwd, arg0, arg1, ...]`
/// followed by `\n`. No length prefix — the line terminator is the only
/// framing a reader needs.
#[must_use]
pub fn encode_request(request: &Request) -> Vec<u8> {
    let mut elements = Vec::with_capacity(2 + request.argv.len());
    let env = Value::Object(
        request
            .env
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    );
    elements.push(env);
    elements.push(Value::String(request.cwd.clone()));
    elements.extend(request.argv.iter().cloned().map(Value::String));

    let mut line = serde_json::to_vec(&Value::Array(elements)).expect("wire values always serialize");
    line.push(b'\n');
    line
}

/// Decode a request line previously produced by [`encode_request`].
/// `line` may or may not include the trailing `\n`; if present it is
/// stripped before parsing.
pub fn decode_request(line: &[u8]) -> Result<Request, WireError> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let value: Value = serde_json::from_slice(line)?;
    let Value::Array(elements) = value else {
        return Err(WireError::NotAnArray);
    };
    if elements.len() < 2 {
        return Err(WireError::TooShort(elements.len()));
    }

    let env = match &elements[0] {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => Ok((k.clone(), s.clone())),
                _ => Err(WireError::BadEnv),
            })
            .collect::<Result<BTreeMap<String, String>, WireError>>()?,
        _ => return Err(WireError::BadEnv),
    };

    let cwd = match &elements[1] {
        Value::String(s) => s.clone(),
        _ => return Err(WireError::BadCwd),
    };

    let argv = elements[2..]
        .iter()
        .enumerate()
        .map(|(i, v)| match v {
            Value::String(s) => Ok(s.clone()),
            _ => Err(WireError::BadArg(i + 2)),
        })
        .collect::<Result<Vec<String>, WireError>>()?;

    Ok(Request { cwd, env, argv })
}

/// Encode `response` as a bare ASCII decimal exit code, no trailing
/// newline — the reader already knows the frame ends when the socket's
/// read returns, since the daemon closes its side right after writing it.
#[must_use]
pub fn encode_response(response: Response) -> Vec<u8> {
    response.exit_code.to_string().into_bytes()
}

/// Parse a response previously produced by [`encode_response`].
pub fn decode_response(buf: &[u8]) -> Result<Response, WireError> {
    let text = String::from_utf8_lossy(buf);
    text.trim()
        .parse::<i32>()
        .map(|exit_code| Response { exit_code })
        .map_err(|_| WireError::Malformed(serde_json::Error::custom("exit code is not an integer")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_through_the_wire() {
        let mut env = BTreeMap::new();
        env.insert("HOME".to_string(), "/home/nora".to_string());
        let request = Request::new("/tmp/work", env, vec!["aws".into(), "ec2".into(), "describe-instances".into()]);

        let line = encode_request(&request);
        let decoded = decode_request(&line).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn encoded_request_is_a_newline_terminated_positional_array() {
        let request = Request::new("/tmp", BTreeMap::new(), vec!["aws".into()]);
        let line = encode_request(&request);
        assert_eq!(line.last(), Some(&b'\n'));
        let text = String::from_utf8(line).unwrap();
        assert_eq!(text, "[{},\"/tmp\",\"aws\"]\n");
    }

    #[test]
    fn decode_accepts_the_line_with_or_without_its_newline() {
        let request = Request::new("/tmp", BTreeMap::new(), vec![]);
        let with_newline = encode_request(&request);
        let mut without_newline = with_newline.clone();
        without_newline.pop();
        assert_eq!(decode_request(&with_newline).unwrap(), request);
        assert_eq!(decode_request(&without_newline).unwrap(), request);
    }

    #[test]
    fn decode_rejects_a_non_array_payload() {
        let err = decode_request(b"{}\n").unwrap_err();
        assert!(matches!(err, WireError::NotAnArray));
    }

    #[test]
    fn decode_rejects_too_few_elements() {
        let err = decode_request(b"[{}]\n").unwrap_err();
        assert!(matches!(err, WireError::TooShort(1)));
    }

    #[test]
    fn decode_rejects_non_string_argv_element() {
        let err = decode_request(b"[{},\"/tmp\",1]\n").unwrap_err();
        assert!(matches!(err, WireError::BadArg(2)));
    }

    #[test]
    fn response_round_trips_as_ascii_with_no_trailing_newline() {
        let response = Response { exit_code: 42 };
        let encoded = encode_response(response);
        assert_eq!(encoded, b"42");
        assert_eq!(decode_response(&encoded).unwrap(), response);
    }

    #[test]
    fn response_round_trips_negative_exit_code() {
        let response = Response { exit_code: -1 };
        let encoded = encode_response(response);
        assert_eq!(decode_response(&encoded).unwrap(), response);
    }
}
