// Copyright (C) 2025  Tom Waddington
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Script parser for codetyper files
//!
//! Parses scripts with the format:
//! - @ directives (speed, jitter, wait, cursor and scroll control)
//! - @ block[:level] ... @ end sections typed shell first
//! - # comments
//! - $ typing lines

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_until, take_while1},
    character::complete::{char, not_line_ending, satisfy, space0},
    combinator::{map, map_res, not, opt, value, verify},
    number::complete::double,
    sequence::preceded,
};
use std::time::Duration;

use crate::actions::{
    backspace, change_jitter, change_typing_speed, goto_marker, mark_cursor, scroll_by,
    seek_first, seek_next, seek_previous, set_instant_mode, set_scroll_absolute, shift_cursor,
    stop, type_text, wait,
};
use crate::block::type_indented_block;
use crate::types::{Action, Script};

const DEFAULT_INDENT: &str = "  ";
const SCROLL_EVERY: Duration = Duration::from_millis(10);

const KNOWN_DIRECTIVES: &[&str] = &[
    "speed",
    "jitter",
    "wait",
    "instant",
    "mark",
    "goto",
    "after",
    "next",
    "prev",
    "move",
    "backspace",
    "scroll",
    "scrollto",
    "stop",
    "block",
    "end",
    "indent",
];

fn directive<'a>(input: &'a str, name: &str) -> IResult<&'a str, ()> {
    let (input, _) = tag("@")(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = tag(name)(input)?;
    Ok((input, ()))
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

// A bare directive name must not run into a longer name
fn name_end(input: &str) -> IResult<&str, ()> {
    not(satisfy(is_name_char)).parse(input)
}

// Rejects negative, non-finite and out-of-range durations
fn parse_seconds(input: &str) -> IResult<&str, Duration> {
    map_res(double, Duration::try_from_secs_f64).parse(input)
}

fn parse_label(input: &str) -> IResult<&str, &str> {
    let (input, label) = verify(not_line_ending, |s: &str| !s.trim().is_empty()).parse(input)?;
    Ok((input, label.trim()))
}

fn parse_speed(input: &str) -> IResult<&str, Action> {
    let (input, _) = directive(input, "speed:")?;
    let (input, per_char) = parse_seconds(input)?;
    Ok((input, change_typing_speed(per_char)))
}

fn parse_jitter(input: &str) -> IResult<&str, Action> {
    let (input, _) = directive(input, "jitter:")?;
    let (input, value) = verify(double, |v: &f64| (0.0..=1.0).contains(v)).parse(input)?;
    Ok((input, change_jitter(value)))
}

fn parse_wait(input: &str) -> IResult<&str, Action> {
    let (input, _) = directive(input, "wait:")?;
    let (input, duration) = parse_seconds(input)?;
    Ok((input, wait(duration)))
}

fn parse_instant(input: &str) -> IResult<&str, Action> {
    let (input, _) = directive(input, "instant:")?;
    let (input, enabled) = alt((value(true, tag("on")), value(false, tag("off")))).parse(input)?;
    Ok((input, set_instant_mode(enabled)))
}

fn parse_mark(input: &str) -> IResult<&str, Action> {
    let (input, _) = directive(input, "mark:")?;
    let (input, label) = parse_label(input)?;
    Ok((input, mark_cursor(label)))
}

fn parse_goto(input: &str) -> IResult<&str, Action> {
    let (input, _) = directive(input, "goto:")?;
    let (input, label) = parse_label(input)?;
    Ok((input, goto_marker(label)))
}

fn parse_after(input: &str) -> IResult<&str, Action> {
    let (input, _) = directive(input, "after:")?;
    let (input, needle) = parse_label(input)?;
    Ok((input, seek_first(parse_type_content(needle))))
}

fn parse_next(input: &str) -> IResult<&str, Action> {
    let (input, _) = directive(input, "next:")?;
    let (input, needle) = parse_label(input)?;
    Ok((input, seek_next(parse_type_content(needle))))
}

fn parse_prev(input: &str) -> IResult<&str, Action> {
    let (input, _) = directive(input, "prev:")?;
    let (input, needle) = parse_label(input)?;
    Ok((input, seek_previous(parse_type_content(needle))))
}

fn parse_move(input: &str) -> IResult<&str, Action> {
    let (input, _) = directive(input, "move:")?;
    let (input, delta) = nom::character::complete::i64(input)?;
    Ok((input, shift_cursor(delta as isize)))
}

fn parse_backspace(input: &str) -> IResult<&str, Action> {
    let (input, _) = directive(input, "backspace:")?;
    let (input, count) = nom::character::complete::u32(input)?;
    Ok((input, backspace(count as usize)))
}

fn parse_scroll(input: &str) -> IResult<&str, Action> {
    let (input, _) = directive(input, "scroll:")?;
    let (input, offset) = nom::character::complete::i64(input)?;
    Ok((input, scroll_by(offset, SCROLL_EVERY)))
}

fn parse_scrollto(input: &str) -> IResult<&str, Action> {
    let (input, _) = directive(input, "scrollto:")?;
    let (input, target) = nom::character::complete::i64(input)?;
    Ok((input, set_scroll_absolute(target)))
}

fn parse_stop(input: &str) -> IResult<&str, Action> {
    let (input, _) = directive(input, "stop")?;
    let (input, _) = name_end(input)?;
    Ok((input, stop()))
}

fn parse_unrecognized(input: &str) -> IResult<&str, Action> {
    let (input, _) = tag("@")(input)?;
    let (input, _) = space0(input)?;
    let (input, name) = verify(
        take_while1(is_name_char),
        |name: &str| !KNOWN_DIRECTIVES.contains(&name),
    )
    .parse(input)?;
    let (input, _) = opt(preceded(char(':'), not_line_ending)).parse(input)?;
    Ok((input, Action::Unrecognized(name.to_string())))
}

fn parse_directive(input: &str) -> IResult<&str, Action> {
    alt((
        parse_speed,
        parse_jitter,
        parse_wait,
        parse_instant,
        parse_mark,
        parse_goto,
        parse_after,
        parse_next,
        parse_prev,
        parse_move,
        parse_backspace,
        parse_scroll,
        parse_scrollto,
        parse_stop,
        parse_unrecognized,
    ))
    .parse(input)
}

fn parse_block_start(input: &str) -> IResult<&str, usize> {
    let (input, _) = directive(input, "block")?;
    let (input, _) = name_end(input)?;
    let (input, level) = opt(preceded(char(':'), nom::character::complete::u32)).parse(input)?;
    Ok((input, level.unwrap_or(0) as usize))
}

fn parse_block_end(input: &str) -> IResult<&str, ()> {
    let (input, _) = directive(input, "end")?;
    name_end(input)
}

fn parse_indent(input: &str) -> IResult<&str, String> {
    let (input, _) = directive(input, "indent:")?;
    alt((
        value("\t".to_string(), tag("tab")),
        map(nom::character::complete::u8, |width| {
            " ".repeat(usize::from(width))
        }),
    ))
    .parse(input)
}

fn parse_comment(input: &str) -> IResult<&str, ()> {
    let (input, _) = char('#')(input)?;
    let (input, _) = not_line_ending(input)?;
    Ok((input, ()))
}

fn parse_special_key(input: &str) -> IResult<&str, String> {
    let (input, _) = char('<')(input)?;
    let (input, key_spec) = take_until(">")(input)?;
    let (input, _) = char('>')(input)?;

    let text = match key_spec {
        "ret" | "return" | "enter" => "\n".to_string(),
        "tab" => "\t".to_string(),
        "space" => " ".to_string(),
        _ => format!("<{}>", key_spec),
    };

    Ok((input, text))
}

fn parse_type_content(input: &str) -> String {
    let mut result = String::new();
    let mut remaining = input;

    while let Some(c) = remaining.chars().next() {
        if remaining.starts_with("\\<") || remaining.starts_with("\\>") {
            result.push_str(&remaining[1..2]);
            remaining = &remaining[2..];
        } else if c == '<' {
            match parse_special_key(remaining) {
                Ok((rest, text)) => {
                    result.push_str(&text);
                    remaining = rest;
                }
                Err(_) => {
                    result.push('<');
                    remaining = &remaining[1..];
                }
            }
        } else {
            result.push(c);
            remaining = &remaining[c.len_utf8()..];
        }
    }

    result
}

fn parse_type(input: &str) -> IResult<&str, Action> {
    let (input, _) = char('$')(input)?;
    let (input, _) = space0(input)?;
    let (input, text) = not_line_ending(input)?;

    Ok((input, type_text(parse_type_content(text))))
}

fn parse_line(input: &str) -> IResult<&str, Option<Action>> {
    alt((
        map(parse_directive, Some),
        value(None, parse_comment),
        map(parse_type, Some),
    ))
    .parse(input)
}

pub fn parse_script(input: &str) -> Result<Script, String> {
    let mut actions = Vec::new();
    let mut indent = DEFAULT_INDENT.to_string();
    let mut lines = input.lines().enumerate();

    while let Some((line_num, line)) = lines.next() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if let Ok((remaining, level)) = parse_block_start(trimmed) {
            if !remaining.trim().is_empty() {
                return Err(format!(
                    "Line {}: Unexpected text after block: '{}'",
                    line_num + 1,
                    remaining
                ));
            }

            // Block bodies are kept verbatim, indentation included
            let mut body = Vec::new();
            let mut closed = false;
            for (_, raw) in lines.by_ref() {
                if matches!(parse_block_end(raw.trim()), Ok((rest, _)) if rest.trim().is_empty()) {
                    closed = true;
                    break;
                }
                body.push(raw);
            }
            if !closed {
                return Err(format!(
                    "Line {}: Block is never closed with '@ end'",
                    line_num + 1
                ));
            }

            actions.extend(type_indented_block(&body.join("\n"), level, &indent));
            continue;
        }

        if let Ok((remaining, marker)) = parse_indent(trimmed) {
            if !remaining.trim().is_empty() {
                return Err(format!(
                    "Line {}: Unexpected text after command: '{}'",
                    line_num + 1,
                    remaining
                ));
            }
            indent = marker;
            continue;
        }

        match parse_line(trimmed) {
            Ok((remaining, Some(action))) => {
                if !remaining.trim().is_empty() {
                    return Err(format!(
                        "Line {}: Unexpected text after command: '{}'",
                        line_num + 1,
                        remaining
                    ));
                }
                actions.push(action);
            }
            Ok((_, None)) => {}
            Err(e) => {
                return Err(format!("Line {}: Parse error: {}", line_num + 1, e));
            }
        }
    }

    Ok(Script { actions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::CodeTyper;

    #[test]
    fn test_parse_speed() {
        let input = "@ speed:0.2";
        let result = parse_speed(input);
        assert!(result.is_ok());
        let (_, action) = result.unwrap();
        assert_eq!(action, Action::ChangeTypingSpeed(Duration::from_millis(200)));
    }

    #[test]
    fn test_parse_jitter() {
        let input = "@ jitter:0.02";
        let result = parse_jitter(input);
        assert!(result.is_ok());
        let (_, action) = result.unwrap();
        assert_eq!(action, Action::ChangeJitter(0.02));
    }

    #[test]
    fn test_parse_jitter_out_of_range() {
        assert!(parse_jitter("@ jitter:1.5").is_err());
    }

    #[test]
    fn test_parse_wait() {
        let input = "@ wait:2.0";
        let result = parse_wait(input);
        assert!(result.is_ok());
        let (_, action) = result.unwrap();
        assert_eq!(action, Action::Wait(Duration::from_secs_f64(2.0)));
    }

    #[test]
    fn test_parse_wait_rejects_negative() {
        assert!(parse_wait("@ wait:-1").is_err());
    }

    #[test]
    fn test_parse_seconds_out_of_range() {
        assert!(parse_wait("@ wait:1e20").is_err());
        assert!(parse_speed("@ speed:1e20").is_err());
        let result = parse_script("@ wait:1e20");
        assert!(result.unwrap_err().starts_with("Line 1: Parse error"));
    }

    #[test]
    fn test_parse_markers() {
        let (_, action) = parse_mark("@ mark: body ").unwrap();
        assert_eq!(action, Action::MarkCursor("body".to_string()));
        let (_, action) = parse_goto("@goto:body").unwrap();
        assert_eq!(action, Action::GotoMarker("body".to_string()));
        assert!(parse_mark("@ mark:").is_err());
    }

    #[test]
    fn test_parse_instant() {
        let (_, action) = parse_instant("@ instant:on").unwrap();
        assert_eq!(action, Action::SetInstantMode(true));
        let (_, action) = parse_instant("@ instant:off").unwrap();
        assert_eq!(action, Action::SetInstantMode(false));
    }

    #[test]
    fn test_parse_scroll() {
        let (_, action) = parse_scroll("@ scroll:-3").unwrap();
        assert_eq!(
            action,
            Action::ScrollBy {
                offset: -3,
                every: SCROLL_EVERY,
                instant: false,
            }
        );
        let (_, action) = parse_directive("@ scrollto:12").unwrap();
        assert_eq!(action, Action::SetScrollAbsolute(12));
    }

    #[test]
    fn test_parse_type() {
        let input = "$ echo hello";
        let result = parse_type(input);
        assert!(result.is_ok());
        let (_, action) = result.unwrap();
        assert_eq!(action, Action::Type("echo hello".to_string()));
    }

    #[test]
    fn test_parse_type_with_special_keys() {
        let input = "$ fn main() {<ret><tab>x<space>}";
        let result = parse_type(input);
        assert!(result.is_ok());
        let (_, action) = result.unwrap();
        if let Action::Type(text) = action {
            assert_eq!(text, "fn main() {\n\tx }");
        } else {
            panic!("Expected Type action");
        }
    }

    #[test]
    fn test_parse_type_with_escaped() {
        let input = r"$ \<not a key\> <C-c> <unclosed";
        let result = parse_type(input);
        assert!(result.is_ok());
        let (_, action) = result.unwrap();
        if let Action::Type(text) = action {
            assert_eq!(text, "<not a key> <C-c> <unclosed");
        } else {
            panic!("Expected Type action");
        }
    }

    #[test]
    fn test_unknown_directive_is_kept() {
        let (_, action) = parse_directive("@ sparkle:lots").unwrap();
        assert_eq!(action, Action::Unrecognized("sparkle".to_string()));
    }

    #[test]
    fn test_longer_names_are_not_known_directives() {
        let script = parse_script("@ stopwatch\n@ blockquote:2\n$ a").unwrap();
        assert_eq!(
            script.actions,
            vec![
                Action::Unrecognized("stopwatch".to_string()),
                Action::Unrecognized("blockquote".to_string()),
                Action::Type("a".to_string()),
            ]
        );

        let script = parse_script("@ instant:on\n@ block\n@ endless\n@ end\n@ stop").unwrap();
        assert_eq!(script.actions.last(), Some(&Action::Stop));
        let mut typer = CodeTyper::new(script.actions);
        assert_eq!(typer.fast_forward().unwrap(), "@ endless");
    }

    #[test]
    fn test_malformed_known_directive_is_an_error() {
        let result = parse_script("@ speed:fast");
        assert!(result.unwrap_err().starts_with("Line 1: Parse error"));
    }

    #[test]
    fn test_parse_script() {
        let input = r#"@ speed:0.2
@ jitter:0.02
# This is a comment
$ echo hello
@ wait:1.0
$ ls -la
"#;
        let result = parse_script(input);
        if let Err(e) = &result {
            eprintln!("Parse error: {}", e);
        }
        assert!(result.is_ok());
        let script = result.unwrap();
        assert_eq!(script.actions.len(), 5);
    }

    #[test]
    fn test_trailing_text_is_an_error() {
        let result = parse_script("@ instant:on please");
        assert_eq!(
            result.unwrap_err(),
            "Line 1: Unexpected text after command: ' please'"
        );
    }

    #[test]
    fn test_parse_block() {
        let input = "@ instant:on\n@ block\nfn main() {\n    body();\n}\n@ end\n$ <ret>// done";
        let script = parse_script(input).unwrap();
        assert!(script.actions.iter().any(|a| matches!(a, Action::MarkCursor(_))));

        let mut typer = CodeTyper::new(script.actions);
        assert_eq!(
            typer.fast_forward().unwrap(),
            "fn main() {\n    body();\n}\n// done"
        );
    }

    #[test]
    fn test_parse_block_with_level_and_indent() {
        let input = "@ instant:on\n@ indent:4\n@ block:1\nif x {\n    y\n}\n@ end";
        let script = parse_script(input).unwrap();
        let mut typer = CodeTyper::new(script.actions);
        assert_eq!(typer.fast_forward().unwrap(), "    if x {\n        y\n    }");
    }

    #[test]
    fn test_unterminated_block() {
        let result = parse_script("$ a\n@ block\nfoo");
        assert_eq!(
            result.unwrap_err(),
            "Line 2: Block is never closed with '@ end'"
        );
    }

    #[test]
    fn test_script_seeks() {
        let input = "@ instant:on\n$ hello world\n@ after:hello\n$ ,\n@ move:-1\n@ backspace:5\n@ stop\n$ never";
        let script = parse_script(input).unwrap();
        let mut typer = CodeTyper::new(script.actions);
        assert_eq!(typer.fast_forward().unwrap(), ", world");
    }
}
