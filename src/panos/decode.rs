//! XML API response decoding
//!
//! PAN-OS answers every call with a small `<response status="...">`
//! document. The body is tokenized with a `logos` lexer and folded into a
//! minimal element tree; only what the typed results need is extracted.

use crate::core::error::{Error, Result};
use logos::{Lexer, Logos};

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    #[token("<![CDATA[", cdata)]
    CData(&'a str),

    #[token("<!--", comment)]
    Comment,

    /// Start, end, empty-element or processing-instruction tag
    #[regex(r"<[^!>][^>]*>", |lex| lex.slice())]
    Tag(&'a str),

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'a str),
}

fn cdata<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Option<&'a str> {
    let rest = lex.remainder();
    let end = rest.find("]]>")?;
    lex.bump(end + 3);
    Some(&rest[..end])
}

fn comment<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Option<()> {
    let end = lex.remainder().find("-->")?;
    lex.bump(end + 3);
    Some(())
}

/// Decoded XML element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    text: String,
}

impl Element {
    /// Parses a complete document and returns its root element.
    pub fn parse(input: &str) -> Result<Element> {
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut lexer = Token::lexer(input);

        while let Some(token) = lexer.next() {
            let token = token.map_err(|()| {
                Error::Wire(format!("unexpected input at byte {}", lexer.span().start))
            })?;

            match token {
                Token::Comment => {}
                Token::Text(text) => {
                    let text = unescape(text);
                    match stack.last_mut() {
                        Some(open) => open.text.push_str(&text),
                        None if text.trim().is_empty() => {}
                        None => return Err(Error::Wire("text outside of root element".into())),
                    }
                }
                Token::CData(text) => match stack.last_mut() {
                    Some(open) => open.text.push_str(text),
                    None => return Err(Error::Wire("CDATA outside of root element".into())),
                },
                Token::Tag(tag) => {
                    let inner = &tag[1..tag.len() - 1];
                    if inner.starts_with('?') {
                        continue;
                    }

                    if let Some(name) = inner.strip_prefix('/') {
                        let name = name.trim();
                        let closed = stack
                            .pop()
                            .ok_or_else(|| Error::Wire(format!("unmatched </{name}>")))?;
                        if closed.name != name {
                            return Err(Error::Wire(format!(
                                "expected </{}>, found </{name}>",
                                closed.name
                            )));
                        }
                        attach(&mut stack, &mut root, closed)?;
                        continue;
                    }

                    let (inner, self_closing) = match inner.strip_suffix('/') {
                        Some(inner) => (inner, true),
                        None => (inner, false),
                    };
                    let element = parse_start_tag(inner)?;

                    if self_closing {
                        attach(&mut stack, &mut root, element)?;
                    } else {
                        stack.push(element);
                    }
                }
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::Wire(format!("unterminated element <{}>", open.name)));
        }
        root.ok_or_else(|| Error::Wire("empty document".into()))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Direct child named `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First descendant named `name`, depth-first, excluding `self`.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.children
            .iter()
            .find_map(|c| if c.name == name { Some(c) } else { c.find(name) })
    }

    /// Own text content with surrounding whitespace removed.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Non-empty own text, `None` otherwise.
    pub fn text_opt(&self) -> Option<&str> {
        Some(self.text()).filter(|t| !t.is_empty())
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_some() {
        Err(Error::Wire(format!(
            "second root element <{}>",
            element.name
        )))
    } else {
        *root = Some(element);
        Ok(())
    }
}

fn parse_start_tag(inner: &str) -> Result<Element> {
    let inner = inner.trim();
    let name_end = inner.find(char::is_whitespace).unwrap_or(inner.len());
    let (name, mut rest) = inner.split_at(name_end);
    if name.is_empty() {
        return Err(Error::Wire("element without a name".into()));
    }

    let mut attributes = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        let (key, after) = rest
            .split_once('=')
            .ok_or_else(|| Error::Wire(format!("malformed attribute in <{name}>")))?;
        let after = after.trim_start();
        let quote = after
            .chars()
            .next()
            .filter(|c| matches!(c, '"' | '\''))
            .ok_or_else(|| Error::Wire(format!("unquoted attribute in <{name}>")))?;
        let value_end = after[1..]
            .find(quote)
            .ok_or_else(|| Error::Wire(format!("unterminated attribute in <{name}>")))?;

        attributes.push((key.trim().to_string(), unescape(&after[1..=value_end])));
        rest = &after[value_end + 2..];
    }

    Ok(Element {
        name: name.to_string(),
        attributes,
        ..Element::default()
    })
}

/// Resolves the predefined entities and numeric character references.
/// Unknown references are kept verbatim.
fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];

        let resolved = rest.find(';').and_then(|end| {
            let entity = &rest[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(std::result::Result::ok)
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, end))
        });

        match resolved {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Generic `<response>` envelope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiResponse {
    /// `success` or `error`; `error` when the attribute is missing
    pub status: String,
    pub code: Option<String>,
    pub message: String,
    /// Set by commit responses
    pub job_id: Option<String>,
    /// Set by keygen responses
    pub key: Option<String>,
}

impl ApiResponse {
    pub fn parse(body: &str) -> Result<Self> {
        let root = response_root(body)?;

        let message = root
            .find("msg")
            .map(|msg| {
                msg.text_opt()
                    .or_else(|| msg.find("line").map(Element::text))
                    .unwrap_or_default()
                    .to_string()
            })
            .unwrap_or_default();

        Ok(Self {
            status: root.attribute("status").unwrap_or("error").to_string(),
            code: root.attribute("code").map(ToString::to_string),
            message,
            job_id: root
                .find("job")
                .and_then(Element::text_opt)
                .map(ToString::to_string),
            key: root
                .find("key")
                .and_then(Element::text_opt)
                .map(ToString::to_string),
        })
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// State of an asynchronous job as reported by `show jobs id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    /// `PEND`, `ACT`, `FIN`, or `unknown` when the response has no job
    pub status: String,
    pub progress: u32,
    /// `OK` or `FAIL` once finished
    pub result: Option<String>,
    /// Detail lines joined with `; `
    pub details: String,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self {
            status: "unknown".to_string(),
            progress: 0,
            result: None,
            details: String::new(),
        }
    }
}

impl JobStatus {
    pub fn parse(body: &str) -> Result<Self> {
        let root = response_root(body)?;
        let Some(job) = root.find("job") else {
            return Ok(Self::default());
        };

        let details = job
            .child("details")
            .map(|details| {
                let lines: Vec<&str> = details
                    .children
                    .iter()
                    .filter(|c| c.name == "line")
                    .map(Element::text)
                    .filter(|t| !t.is_empty())
                    .collect();
                if lines.is_empty() {
                    details.text().to_string()
                } else {
                    lines.join("; ")
                }
            })
            .unwrap_or_default();

        Ok(Self {
            status: job
                .child("status")
                .and_then(Element::text_opt)
                .unwrap_or("unknown")
                .to_string(),
            progress: job
                .child("progress")
                .and_then(|p| p.text().parse().ok())
                .unwrap_or(0),
            result: job
                .child("result")
                .and_then(Element::text_opt)
                .map(ToString::to_string),
            details,
        })
    }
}

fn response_root(body: &str) -> Result<Element> {
    let root = Element::parse(body)?;
    if root.name == "response" {
        Ok(root)
    } else {
        Err(Error::Wire(format!(
            "expected <response> root, found <{}>",
            root.name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tree() {
        let root = Element::parse(
            r#"<?xml version="1.0"?>
            <response status="success" code='19'>
              <!-- comment -->
              <result><entry name="a"/><entry name="b">x &amp; y</entry></result>
            </response>"#,
        )
        .unwrap();

        assert_eq!(root.name, "response");
        assert_eq!(root.attribute("code"), Some("19"));
        let result = root.child("result").unwrap();
        assert_eq!(result.children.len(), 2);
        assert_eq!(result.children[0].attribute("name"), Some("a"));
        assert_eq!(result.children[1].text(), "x & y");
        assert_eq!(root.find("entry").unwrap().attribute("name"), Some("a"));
    }

    #[test]
    fn test_malformed_documents() {
        for body in [
            "",
            "   ",
            "<response>",
            "<a></b>",
            "</a>",
            "<a/><b/>",
            "text",
            "<a x=1/>",
            "<a x=\"1/>",
            "<![CDATA[never closed",
        ] {
            let err = Element::parse(body).unwrap_err();
            assert!(matches!(err, Error::Wire(_)), "{body:?}");
        }
    }

    #[test]
    fn test_success_with_msg_text() {
        let response =
            ApiResponse::parse(r#"<response status="success" code="20"><msg>command succeeded</msg></response>"#)
                .unwrap();
        assert!(response.is_success());
        assert_eq!(response.code.as_deref(), Some("20"));
        assert_eq!(response.message, "command succeeded");
    }

    #[test]
    fn test_error_with_nested_line() {
        let response = ApiResponse::parse(
            "<response status=\"error\" code=\"12\"><msg><line><![CDATA[ rules -> Allow-Web -> from 'lab' is not a valid reference]]></line></msg></response>",
        )
        .unwrap();
        assert!(!response.is_success());
        assert_eq!(
            response.message,
            "rules -> Allow-Web -> from 'lab' is not a valid reference"
        );
    }

    #[test]
    fn test_missing_status_is_error() {
        let response = ApiResponse::parse("<response/>").unwrap();
        assert_eq!(response.status, "error");
        assert_eq!(response.message, "");
        assert_eq!(response.code, None);
    }

    #[test]
    fn test_commit_job_id() {
        let response = ApiResponse::parse(
            r#"<response status="success" code="19"><result><msg><line>Commit job enqueued with jobid 42</line></msg><job>42</job></result></response>"#,
        )
        .unwrap();
        assert_eq!(response.job_id.as_deref(), Some("42"));
        assert_eq!(response.message, "Commit job enqueued with jobid 42");
    }

    #[test]
    fn test_keygen_key() {
        let response = ApiResponse::parse(
            r#"<response status = 'success'><result><key>LUFRPT1abc==</key></result></response>"#,
        )
        .unwrap();
        assert_eq!(response.key.as_deref(), Some("LUFRPT1abc=="));
    }

    #[test]
    fn test_wrong_root() {
        assert!(ApiResponse::parse("<html><body/></html>").is_err());
    }

    #[test]
    fn test_job_status_finished() {
        let status = JobStatus::parse(
            r#"<response status="success"><result><job>
                <id>42</id><type>Commit</type>
                <status>FIN</status><result>FAIL</result><progress>100</progress>
                <details><line>rule Allow-Web: invalid zone</line><line>commit failed</line></details>
            </job></result></response>"#,
        )
        .unwrap();

        assert_eq!(status.status, "FIN");
        assert_eq!(status.progress, 100);
        assert_eq!(status.result.as_deref(), Some("FAIL"));
        assert_eq!(status.details, "rule Allow-Web: invalid zone; commit failed");
    }

    #[test]
    fn test_job_status_active() {
        let status = JobStatus::parse(
            "<response status=\"success\"><result><job><status>ACT</status><progress>55</progress><result>PEND</result><details/></job></result></response>",
        )
        .unwrap();
        assert_eq!(status.status, "ACT");
        assert_eq!(status.progress, 55);
        assert_eq!(status.details, "");
    }

    #[test]
    fn test_job_status_without_job() {
        let status = JobStatus::parse(r#"<response status="success"><result/></response>"#).unwrap();
        assert_eq!(status, JobStatus::default());
        assert_eq!(status.status, "unknown");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("a &lt;b&gt; &#65;&#x42; &bogus; &"), "a <b> AB &bogus; &");
    }
}
