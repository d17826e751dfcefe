// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Turns the bytes of a VCD into a stream of typed events. Nothing in here interprets
// the events beyond what is necessary to split the input into commands and tokens.

use crate::values::Time;
use std::io::{BufRead, Read};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum VcdParseError {
    #[error("[vcd] expected command to start with `$`, not `{0}`")]
    VcdStartChar(String),
    #[error("[vcd] unknown or invalid command: `{0}`, valid are: {list:?}", list=get_vcd_command_str())]
    VcdInvalidCommand(String),
    #[error("[vcd] unexpected number of tokens for command {0}: {1}")]
    VcdUnexpectedNumberOfTokens(String, String),
    #[error("[vcd] unexpected token in VCD body: {0}")]
    VcdUnexpectedBodyToken(String),
    #[error("[vcd] expected an id for a value change, but did not find one")]
    VcdEmptyId,
    #[error("failed to decode string")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("failed to parse an integer")]
    ParseInt(#[from] std::num::ParseIntError),
    #[error("I/O operation failed")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VcdParseError>;

/// Simulation commands that may appear in the body of a VCD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationCommand {
    DumpVars,
    DumpAll,
    DumpOn,
    DumpOff,
    /// closes one of the other simulation commands
    End,
}

/// One unit of information produced by the tokenizer. Byte slices point into a buffer owned
/// by the tokenizer and are only valid for the duration of the callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<'a> {
    Date(&'a [u8]),
    Version(&'a [u8]),
    Comment(&'a [u8]),
    Timescale(&'a [u8], &'a [u8]), // factor, unit
    Scope(&'a [u8], &'a [u8]),     // tpe, name
    UpScope,
    Var(&'a [u8], &'a [u8], &'a [u8], &'a [u8]), // tpe, size, id, name
    EndDefinitions,
    /// `$attrbegin` tokens, emitted by some VHDL simulators and fst2vcd
    Attribute(Vec<&'a [u8]>),
    Time(Time),
    ScalarChange(&'a [u8], &'a [u8]), // value, id
    /// The value includes its `b`, `r` or `s` prefix.
    VectorChange(&'a [u8], &'a [u8]), // value, id
    Simulation(SimulationCommand),
}

/// Reads the complete VCD and calls `callback` once for every event in input order.
/// The first error, either from the input or from the callback, aborts tokenization.
pub fn tokenize(
    mut input: impl BufRead,
    mut callback: impl FnMut(Event) -> Result<()>,
) -> Result<()> {
    let found_body = read_vcd_header(&mut input, &mut callback)?;
    if found_body {
        parse_body(&mut input, &mut callback)?;
    }
    Ok(())
}

/// Returns `true` iff the header was terminated by `$enddefinitions`.
fn read_vcd_header(
    input: &mut impl BufRead,
    callback: &mut impl FnMut(Event) -> Result<()>,
) -> Result<bool> {
    let mut buf: Vec<u8> = Vec::with_capacity(128);
    loop {
        buf.clear();
        let (cmd, body) = match read_command(input, &mut buf)? {
            Some(cmd_and_body) => cmd_and_body,
            // a file that only contains declarations is fine
            None => return Ok(false),
        };
        let parsed = match cmd {
            VcdCmd::Scope => {
                let tokens = find_tokens(body);
                if tokens.is_empty() {
                    return Err(unexpected_n_tokens("scope", &tokens));
                }
                let name = tokens.get(1).cloned().unwrap_or(&[] as &[u8]);
                Event::Scope(tokens[0], name)
            }
            VcdCmd::Var => {
                let tokens = find_tokens(body);
                // the actual variable name could be represented by a variable number of tokens,
                // thus we combine all trailing tokens together
                if tokens.len() < 4 {
                    return Err(unexpected_n_tokens("variable", &tokens));
                }
                let name = join_trailing_tokens(body, &tokens[3..]);
                Event::Var(tokens[0], tokens[1], tokens[2], name)
            }
            VcdCmd::UpScope => Event::UpScope,
            VcdCmd::Date => Event::Date(body),
            VcdCmd::Comment => Event::Comment(body),
            VcdCmd::Version => Event::Version(body),
            VcdCmd::Timescale => {
                let tokens = find_tokens(body);
                let (factor, unit) = match tokens.len() {
                    1 => {
                        // find the first non-numeric character
                        let token = tokens[0];
                        match token.iter().position(|c| !c.is_ascii_digit()) {
                            None => (token, &[] as &[u8]),
                            Some(pos) => (&token[..pos], &token[pos..]),
                        }
                    }
                    2 => (tokens[0], tokens[1]),
                    _ => return Err(unexpected_n_tokens("timescale", &tokens)),
                };
                Event::Timescale(factor, unit)
            }
            VcdCmd::EndDefinitions => {
                callback(Event::EndDefinitions)?;
                return Ok(true);
            }
            VcdCmd::Attribute => {
                let tokens = find_tokens(body);
                if tokens.is_empty() {
                    return Err(unexpected_n_tokens("attribute", &tokens));
                }
                Event::Attribute(tokens)
            }
            VcdCmd::AttributeEnd => {
                // Empty command directly followed by $end
                continue;
            }
        };
        callback(parsed)?;
    }
}

/// Returns the sub-slice of `body` that starts with the first and ends with the last of `tokens`.
/// All tokens must point into `body`.
#[inline]
fn join_trailing_tokens<'a>(body: &'a [u8], tokens: &[&'a [u8]]) -> &'a [u8] {
    let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
        return &[];
    };
    let body_start = body.as_ptr() as usize;
    let start = first.as_ptr() as usize - body_start;
    let end = last.as_ptr() as usize - body_start + last.len();
    &body[start..end]
}

#[inline]
fn unexpected_n_tokens(cmd: &str, tokens: &[&[u8]]) -> VcdParseError {
    VcdParseError::VcdUnexpectedNumberOfTokens(
        cmd.to_string(),
        iter_bytes_to_list_str(tokens.iter()),
    )
}

const VCD_DATE: &[u8] = b"date";
const VCD_TIMESCALE: &[u8] = b"timescale";
const VCD_VAR: &[u8] = b"var";
const VCD_SCOPE: &[u8] = b"scope";
const VCD_UP_SCOPE: &[u8] = b"upscope";
const VCD_COMMENT: &[u8] = b"comment";
const VCD_VERSION: &[u8] = b"version";
const VCD_END_DEFINITIONS: &[u8] = b"enddefinitions";
/// This might be an unofficial extension used by VHDL simulators.
const VCD_ATTRIBUTE_BEGIN: &[u8] = b"attrbegin";
/// Empty command that is generated in fst2vcd by e.g. NVCs VCD-generation
const VCD_ATTRIBUTE_END: &[u8] = b"attrend";
const VCD_COMMANDS: [&[u8]; 10] = [
    VCD_DATE,
    VCD_TIMESCALE,
    VCD_VAR,
    VCD_SCOPE,
    VCD_UP_SCOPE,
    VCD_COMMENT,
    VCD_VERSION,
    VCD_END_DEFINITIONS,
    VCD_ATTRIBUTE_BEGIN,
    VCD_ATTRIBUTE_END,
];

/// Used to show all commands when printing an error message.
fn get_vcd_command_str() -> String {
    iter_bytes_to_list_str(VCD_COMMANDS.iter())
}

fn iter_bytes_to_list_str<'a, I>(bytes: I) -> String
where
    I: Iterator<Item = &'a &'a [u8]>,
{
    bytes
        .map(|c| String::from_utf8_lossy(c))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, PartialEq)]
enum VcdCmd {
    Date,
    Timescale,
    Var,
    Scope,
    UpScope,
    Comment,
    Version,
    EndDefinitions,
    Attribute,
    AttributeEnd,
}

impl VcdCmd {
    fn from_bytes(name: &[u8]) -> Option<Self> {
        match name {
            VCD_VAR => Some(VcdCmd::Var),
            VCD_SCOPE => Some(VcdCmd::Scope),
            VCD_UP_SCOPE => Some(VcdCmd::UpScope),
            VCD_DATE => Some(VcdCmd::Date),
            VCD_TIMESCALE => Some(VcdCmd::Timescale),
            VCD_COMMENT => Some(VcdCmd::Comment),
            VCD_VERSION => Some(VcdCmd::Version),
            VCD_END_DEFINITIONS => Some(VcdCmd::EndDefinitions),
            VCD_ATTRIBUTE_BEGIN => Some(VcdCmd::Attribute),
            VCD_ATTRIBUTE_END => Some(VcdCmd::AttributeEnd),
            _ => None,
        }
    }
}

/// Reads in a command until the `$end`. Uses buf to store the read data.
/// Returns the name and the body of the command or `None` if the input ends before
/// the next command starts.
fn read_command<'a>(
    input: &mut impl BufRead,
    buf: &'a mut Vec<u8>,
) -> Result<Option<(VcdCmd, &'a [u8])>> {
    // start out with an empty buffer
    debug_assert!(buf.is_empty());

    // skip over any preceding whitespace
    let Some(start_char) = skip_whitespace(input)? else {
        return Ok(None);
    };

    if start_char != b'$' {
        return Err(VcdParseError::VcdStartChar(
            String::from_utf8_lossy(&[start_char]).to_string(),
        ));
    }

    // read the rest of the command into the buffer
    read_token(input, buf)?;

    // check to see if this is a valid command
    let cmd = VcdCmd::from_bytes(buf).ok_or_else(|| {
        VcdParseError::VcdInvalidCommand(String::from_utf8_lossy(buf).to_string())
    })?;
    buf.clear();

    // read until we find the end token
    read_until_end_token(input, buf)?;

    // return the name and body of the command
    Ok(Some((cmd, &buf[..])))
}

#[inline]
fn find_tokens(line: &[u8]) -> Vec<&[u8]> {
    line.split(|c| is_white_space(*c))
        .filter(|e| !e.is_empty())
        .collect()
}

#[inline]
fn read_until_end_token(input: &mut impl BufRead, buf: &mut Vec<u8>) -> std::io::Result<()> {
    // count how many characters of the $end token we have recognized
    let mut end_index = 0;
    // we skip any whitespace at the beginning, but not between tokens
    let mut skipping_preceding_whitespace = true;
    loop {
        let byte = read_byte(input)?;
        if skipping_preceding_whitespace {
            if is_white_space(byte) {
                continue;
            }
            skipping_preceding_whitespace = false;
        }
        // we always append and then later drop the `$end` bytes.
        buf.push(byte);
        end_index = match (end_index, byte) {
            (_, b'$') => 1,
            (1, b'e') => 2,
            (2, b'n') => 3,
            (3, b'd') => {
                // we are done!
                buf.truncate(buf.len() - 4); // drop $end
                right_strip(buf);
                return Ok(());
            }
            _ => 0, // reset
        };
    }
}

#[inline]
fn read_token(input: &mut impl BufRead, buf: &mut Vec<u8>) -> std::io::Result<()> {
    loop {
        let byte = read_byte(input)?;
        if is_white_space(byte) {
            return Ok(());
        }
        buf.push(byte);
    }
}

/// Advances the input until the first non-whitespace character which is then returned.
/// Returns `None` if the input ends first.
#[inline]
fn skip_whitespace(input: &mut impl BufRead) -> std::io::Result<Option<u8>> {
    loop {
        let mut byte = [0u8; 1];
        if input.read(&mut byte)? == 0 {
            return Ok(None);
        }
        if !is_white_space(byte[0]) {
            return Ok(Some(byte[0]));
        }
    }
}

#[inline]
fn read_byte(input: &mut impl BufRead) -> std::io::Result<u8> {
    let mut buf = [0u8; 1];
    input.read_exact(&mut buf)?;
    Ok(buf[0])
}

#[inline]
fn right_strip(buf: &mut Vec<u8>) {
    while let Some(&last) = buf.last() {
        if !is_white_space(last) {
            break;
        }
        buf.pop();
    }
}

#[inline]
fn is_white_space(b: u8) -> bool {
    matches!(b, b' ' | b'\n' | b'\r' | b'\t')
}

enum FirstTokenResult {
    Time(Time),
    OneBitValue,
    MultiBitValue,
    CommentStart,
    Simulation(SimulationCommand),
}

fn parse_first_token(token: &[u8]) -> Result<FirstTokenResult> {
    match token[0] {
        b'#' => {
            let value_str = std::str::from_utf8(&token[1..])?;
            // Try parsing as u64
            let value = match value_str.parse::<u64>() {
                Ok(val) => Ok(val),
                Err(e) => {
                    // Try parsing as f64
                    match value_str.parse::<f64>() {
                        Ok(val) if val.fract() == 0.0 && val >= 0.0 => Ok(val as u64),
                        _ => Err(e),
                    }
                }
            }?;
            Ok(FirstTokenResult::Time(value))
        }
        b'0' | b'1' | b'z' | b'Z' | b'x' | b'X' | b'h' | b'H' | b'u' | b'U' | b'w' | b'W'
        | b'l' | b'L' | b'-' => Ok(FirstTokenResult::OneBitValue),
        b'b' | b'B' | b'r' | b'R' | b's' | b'S' => Ok(FirstTokenResult::MultiBitValue),
        _ => match token {
            b"$comment" => Ok(FirstTokenResult::CommentStart),
            b"$dumpvars" => Ok(FirstTokenResult::Simulation(SimulationCommand::DumpVars)),
            b"$dumpall" => Ok(FirstTokenResult::Simulation(SimulationCommand::DumpAll)),
            b"$dumpon" => Ok(FirstTokenResult::Simulation(SimulationCommand::DumpOn)),
            b"$dumpoff" => Ok(FirstTokenResult::Simulation(SimulationCommand::DumpOff)),
            b"$end" => Ok(FirstTokenResult::Simulation(SimulationCommand::End)),
            _ => Err(VcdParseError::VcdUnexpectedBodyToken(
                String::from_utf8_lossy(token).to_string(),
            )),
        },
    }
}

#[inline]
fn one_bit_change<'a>(token: &'a [u8]) -> Result<Event<'a>> {
    let (value, id) = token.split_at(1);
    if id.is_empty() {
        return Err(VcdParseError::VcdEmptyId);
    }
    Ok(Event::ScalarChange(value, id))
}

fn parse_body(
    input: &mut impl BufRead,
    callback: &mut impl FnMut(Event) -> Result<()>,
) -> Result<()> {
    let mut state = BodyState::ParsingFirstToken;

    let mut first = Vec::with_capacity(32);
    let mut id = Vec::with_capacity(32);

    for b in input.bytes() {
        let b = b?;
        match state {
            BodyState::ParsingFirstToken => {
                if is_white_space(b) {
                    if first.is_empty() {
                        // we are in front of the token => nothing to do
                    } else {
                        state = match parse_first_token(&first)? {
                            FirstTokenResult::Time(value) => {
                                callback(Event::Time(value))?;
                                BodyState::ParsingFirstToken
                            }
                            FirstTokenResult::OneBitValue => {
                                callback(one_bit_change(&first)?)?;
                                BodyState::ParsingFirstToken
                            }
                            FirstTokenResult::MultiBitValue => BodyState::ParsingIdToken,
                            FirstTokenResult::CommentStart => BodyState::LookingForEndToken,
                            FirstTokenResult::Simulation(cmd) => {
                                callback(Event::Simulation(cmd))?;
                                BodyState::ParsingFirstToken
                            }
                        };

                        // clear buffer to find next token
                        if state != BodyState::ParsingIdToken {
                            first.clear();
                        }
                    }
                } else {
                    first.push(b);
                }
            }
            BodyState::ParsingIdToken => {
                if is_white_space(b) {
                    if id.is_empty() {
                        // we are in front of the token => nothing to do
                    } else {
                        callback(Event::VectorChange(first.as_slice(), id.as_slice()))?;
                        first.clear();
                        id.clear();
                        state = BodyState::ParsingFirstToken;
                    }
                } else {
                    id.push(b);
                }
            }
            BodyState::LookingForEndToken => {
                if is_white_space(b) {
                    if first.is_empty() {
                        // we are in front of the token => nothing to do
                    } else {
                        if first == b"$end" {
                            state = BodyState::ParsingFirstToken;
                        }
                        first.clear();
                    }
                } else {
                    first.push(b);
                }
            }
        }
    }

    // we reached the end of the file
    match state {
        BodyState::ParsingFirstToken => {
            if !first.is_empty() {
                match parse_first_token(&first)? {
                    FirstTokenResult::Time(value) => callback(Event::Time(value))?,
                    FirstTokenResult::OneBitValue => callback(one_bit_change(&first)?)?,
                    FirstTokenResult::Simulation(cmd) => callback(Event::Simulation(cmd))?,
                    // a vector value without an id
                    FirstTokenResult::MultiBitValue => return Err(VcdParseError::VcdEmptyId),
                    FirstTokenResult::CommentStart => {}
                };
            }
        }
        BodyState::ParsingIdToken => {
            if id.is_empty() {
                return Err(VcdParseError::VcdEmptyId);
            }
            callback(Event::VectorChange(first.as_slice(), id.as_slice()))?;
        }
        BodyState::LookingForEndToken => {} // unterminated comment
    }
    Ok(())
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum BodyState {
    ParsingFirstToken,
    ParsingIdToken,
    LookingForEndToken,
}
