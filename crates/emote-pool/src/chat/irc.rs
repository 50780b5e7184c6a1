//! Minimal IRC line parsing with IRCv3 tags, as spoken by Twitch chat.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    pub tags: HashMap<String, String>,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl IrcMessage {
    /// Parse one line (without the trailing CRLF).
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        let mut tags = HashMap::new();
        if let Some(tagged) = rest.strip_prefix('@') {
            let (raw_tags, tail) = tagged.split_once(' ')?;
            for tag in raw_tags.split(';').filter(|t| !t.is_empty()) {
                let (key, value) = tag.split_once('=').unwrap_or((tag, ""));
                tags.insert(key.to_string(), unescape_tag_value(value));
            }
            rest = tail.trim_start();
        }

        let mut prefix = None;
        if let Some(prefixed) = rest.strip_prefix(':') {
            let (raw_prefix, tail) = prefixed.split_once(' ')?;
            prefix = Some(raw_prefix.to_string());
            rest = tail.trim_start();
        }

        let (head, trailing) = match rest.split_once(" :") {
            Some((head, trailing)) => (head, Some(trailing)),
            None => (rest, None),
        };

        let mut words = head.split(' ').filter(|w| !w.is_empty());
        let command = words.next()?.to_string();
        let mut params: Vec<String> = words.map(str::to_string).collect();
        if let Some(trailing) = trailing {
            params.push(trailing.to_string());
        }

        Some(Self {
            tags,
            prefix,
            command,
            params,
        })
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Nick part of `nick!user@host`.
    pub fn nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        Some(prefix.split('!').next().unwrap_or(prefix))
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }
}

fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ping() {
        let msg = IrcMessage::parse("PING :tmi.twitch.tv").unwrap();
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.trailing(), Some("tmi.twitch.tv"));
        assert!(msg.prefix.is_none());
        assert!(msg.tags.is_empty());
    }

    #[test]
    fn parses_tagged_privmsg() {
        let line = "@badge-info=;display-name=Alice_B;id=b34ccfc7-4977-403a-8a94-33c6bac34fb8;mod=0 \
                    :alice_b!alice_b@alice_b.tmi.twitch.tv PRIVMSG #streamer :!7tv catJAM\r\n";
        let msg = IrcMessage::parse(line).unwrap();

        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.nick(), Some("alice_b"));
        assert_eq!(msg.param(0), Some("#streamer"));
        assert_eq!(msg.trailing(), Some("!7tv catJAM"));
        assert_eq!(msg.tag("display-name"), Some("Alice_B"));
        assert_eq!(
            msg.tag("id"),
            Some("b34ccfc7-4977-403a-8a94-33c6bac34fb8")
        );
        assert_eq!(msg.tag("badge-info"), Some(""));
    }

    #[test]
    fn parses_numeric_welcome() {
        let msg = IrcMessage::parse(":tmi.twitch.tv 001 slotbot :Welcome, GLHF!").unwrap();
        assert_eq!(msg.command, "001");
        assert_eq!(msg.params, vec!["slotbot", "Welcome, GLHF!"]);
    }

    #[test]
    fn unescapes_tag_values() {
        let msg =
            IrcMessage::parse(r"@system-msg=hello\sthere\:\\ok :tmi.twitch.tv USERNOTICE #c").unwrap();
        assert_eq!(msg.tag("system-msg"), Some(r"hello there;\ok"));
    }

    #[test]
    fn trailing_may_contain_colons() {
        let msg = IrcMessage::parse(":a!a@a PRIVMSG #c :time is 12:30 :)").unwrap();
        assert_eq!(msg.trailing(), Some("time is 12:30 :)"));
    }

    #[test]
    fn rejects_empty_lines() {
        assert!(IrcMessage::parse("").is_none());
        assert!(IrcMessage::parse("@only-tags").is_none());
    }
}
