/// Alternate identity a user may proxy chat messages through, made up of
/// one or more members that take turns fronting.
#[derive(Debug, Clone)]
pub struct System {
    pub id: String,
    pub name: String,
    /// Members currently fronting, in registration order.
    pub fronters: Vec<Member>,
}

impl System {
    /// Member claiming `message`: the first fronter whose proxy tags wrap
    /// it, else the first fronter.
    pub fn proxy_for(&self, message: &str) -> Option<&Member> {
        self.fronters
            .iter()
            .find(|member| member.proxy_tags.iter().any(|tag| tag.matches(message)))
            .or_else(|| self.fronters.first())
    }
}

#[derive(Debug, Clone)]
pub struct Member {
    pub id: String,
    pub display_name: String,
    pub proxy_tags: Vec<ProxyTag>,
}

/// Prefix/suffix pair marking a message as belonging to a member.
#[derive(Debug, Clone)]
pub struct ProxyTag {
    pub prefix: String,
    pub suffix: String,
}

impl ProxyTag {
    pub fn matches(&self, message: &str) -> bool {
        message.len() >= self.prefix.len() + self.suffix.len()
            && message.starts_with(&self.prefix)
            && message.ends_with(&self.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, prefix: &str, suffix: &str) -> Member {
        Member {
            id: name.to_lowercase(),
            display_name: name.to_string(),
            proxy_tags: vec![ProxyTag {
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
            }],
        }
    }

    #[test]
    fn tag_requires_prefix_and_suffix() {
        let tag = ProxyTag {
            prefix: "[".to_string(),
            suffix: "]".to_string(),
        };
        assert!(tag.matches("[hello]"));
        assert!(!tag.matches("[hello"));
        assert!(!tag.matches("hello]"));
        // Too short to contain both ends separately.
        assert!(!tag.matches("["));
    }

    #[test]
    fn first_matching_fronter_wins() {
        let system = System {
            id: "abcde".to_string(),
            name: "Example".to_string(),
            fronters: vec![member("A", "a:", ""), member("B", "b:", "")],
        };
        assert_eq!(system.proxy_for("b: hi").unwrap().display_name, "B");
        // No tag matches: the first fronter claims the message.
        assert_eq!(system.proxy_for("hi").unwrap().display_name, "A");
    }
}
