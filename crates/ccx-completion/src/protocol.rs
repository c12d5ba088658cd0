// SPDX-License-Identifier: MIT OR Apache-2.0
//! The wire format spoken to the shell-side completion hook: a single
//! NUL-terminated `complete` or `delegate` record.

/// One completion candidate: the word itself, whether it should be
/// followed by a trailing space (a flag name usually is; a partial path
/// component usually isn't), and its documentation (empty when no
/// per-candidate doc source applies).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub trailing_space: bool,
    pub doc: String,
}

impl Candidate {
    /// A candidate with no documentation and no trailing space, the
    /// common case for value completions (region codes, enum values,
    /// `--query` paths).
    #[must_use]
    pub fn simple(name: impl Into<String>) -> Self {
        Candidate {
            name: name.into(),
            trailing_space: false,
            doc: String::new(),
        }
    }
}

/// What the engine decided for one completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionResult {
    /// Offer these candidates (possibly empty — "no matches").
    Complete(Vec<Candidate>),
    /// This position isn't one the engine understands; the shell hook
    /// should run `cmd arg...` as the completer instead.
    Delegate { cmd: String, args: Vec<String> },
}

/// Serialize a result for the shell hook to read off this process's
/// stdout.
///
/// `complete\n<name_1>[ ]\n...\n<doc_1>\n...\x00`: one line per candidate
/// name (a trailing space marks a name that should absorb the following
/// space, e.g. a flag), followed by one line per candidate doc in the
/// same order, terminated by a NUL byte.
///
/// `delegate\n<cmd>\n<arg>...\x00`: the external command and args the
/// shell hook should run in this process's place.
#[must_use]
pub fn encode(result: &CompletionResult) -> Vec<u8> {
    let mut out = Vec::new();
    match result {
        CompletionResult::Complete(candidates) => {
            out.extend_from_slice(b"complete\n");
            for candidate in candidates {
                out.extend_from_slice(candidate.name.as_bytes());
                if candidate.trailing_space {
                    out.push(b' ');
                }
                out.push(b'\n');
            }
            for (i, candidate) in candidates.iter().enumerate() {
                if i > 0 {
                    out.push(b'\n');
                }
                out.extend_from_slice(candidate.doc.as_bytes());
            }
        }
        CompletionResult::Delegate { cmd, args } => {
            out.extend_from_slice(b"delegate\n");
            out.extend_from_slice(cmd.as_bytes());
            for arg in args {
                out.push(b'\n');
                out.extend_from_slice(arg.as_bytes());
            }
        }
    }
    out.push(0);
    out
}

/// Parse a stream previously produced by [`encode`]. Used by tests and by
/// the integration harness that drives the completion binary end to end.
#[must_use]
pub fn decode(bytes: &[u8]) -> Option<CompletionResult> {
    let body = bytes.strip_suffix(&[0])?;
    let text = String::from_utf8_lossy(body);
    let mut lines = text.split('\n');
    match lines.next()? {
        "complete" => {
            let rest: Vec<&str> = lines.collect();
            if rest.len() % 2 != 0 {
                return None;
            }
            let n = rest.len() / 2;
            let candidates = (0..n)
                .map(|i| {
                    let raw_name = rest[i];
                    let (name, trailing_space) = match raw_name.strip_suffix(' ') {
                        Some(stripped) => (stripped.to_string(), true),
                        None => (raw_name.to_string(), false),
                    };
                    Candidate {
                        name,
                        trailing_space,
                        doc: rest[n + i].to_string(),
                    }
                })
                .collect();
            Some(CompletionResult::Complete(candidates))
        }
        "delegate" => {
            let rest: Vec<String> = lines.map(str::to_string).collect();
            let mut rest = rest.into_iter();
            let cmd = rest.next()?;
            Some(CompletionResult::Delegate {
                cmd,
                args: rest.collect(),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_round_trips_through_framing() {
        let result = CompletionResult::Complete(vec![
            Candidate::simple("us-east-1"),
            Candidate {
                name: "--region".into(),
                trailing_space: true,
                doc: "The AWS region to use".into(),
            },
        ]);
        assert_eq!(decode(&encode(&result)).unwrap(), result);
    }

    #[test]
    fn empty_completion_list_round_trips() {
        let result = CompletionResult::Complete(Vec::new());
        assert_eq!(decode(&encode(&result)).unwrap(), result);
    }

    #[test]
    fn delegate_round_trips_with_args() {
        let result = CompletionResult::Delegate {
            cmd: "compgen".into(),
            args: vec!["-f".into(), "--".into()],
        };
        assert_eq!(decode(&encode(&result)).unwrap(), result);
    }

    #[test]
    fn delegate_round_trips_with_no_args() {
        let result = CompletionResult::Delegate {
            cmd: "compgen".into(),
            args: Vec::new(),
        };
        assert_eq!(decode(&encode(&result)).unwrap(), result);
    }
}
