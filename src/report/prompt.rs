/// Marker that must prefix the headline line of an accepted reply.
pub const HEADLINE_MARKER: &str = "HEADLINE:";
/// Reply token meaning "nothing worth reporting".
pub const NO_NEWS_SENTINEL: &str = "NO_NEWS";

/// Parsed summarizer reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportVerdict {
    Accepted(String),
    /// The summarizer explicitly declined.
    Rejected,
    /// Neither a headline nor the sentinel could be found.
    Malformed,
}

/// Assemble the summarizer prompt for one investigation.
///
/// Earlier headlines are listed oldest first so the model can tell what it
/// already said; with history present it is asked to report only material
/// developments.
pub fn build_prompt<'a, I>(investigation_id: &str, history: I, context: &str) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    let history: Vec<&String> = history.into_iter().collect();
    let mut prompt = String::new();

    prompt.push_str(
        "You monitor a stream of community discussions. Below is the evidence \
         collected for one developing topic.\n\n",
    );
    prompt.push_str(&format!("Topic: {investigation_id}\n\n"));

    if !history.is_empty() {
        prompt.push_str("Headlines already published for this topic (oldest first):\n");
        for (position, headline) in history.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", position + 1, headline));
        }
        prompt.push_str(
            "\nOnly report again if the evidence shows a materially new development. \
             Do not repeat or rephrase an earlier headline.\n\n",
        );
    }

    prompt.push_str("Evidence (most recent last):\n");
    prompt.push_str(context);
    prompt.push_str("\n\n");

    prompt.push_str(&format!(
        "If this is newsworthy, reply with exactly one line of the form\n\
         {HEADLINE_MARKER} <concise factual headline>\n\
         Otherwise reply with {NO_NEWS_SENTINEL}.\n"
    ));

    prompt
}

/// Classify a raw summarizer reply.
///
/// The sentinel anywhere wins over a headline. Matching of both tokens is
/// case-insensitive; decoration around the headline (quotes, bold markers)
/// is stripped.
pub fn parse_reply(reply: &str) -> ReportVerdict {
    if reply.to_ascii_uppercase().contains(NO_NEWS_SENTINEL) {
        return ReportVerdict::Rejected;
    }

    for line in reply.lines() {
        let upper = line.to_ascii_uppercase();
        let Some(position) = upper.find(HEADLINE_MARKER) else {
            continue;
        };
        let headline = line[position + HEADLINE_MARKER.len()..]
            .trim()
            .trim_matches(|ch: char| ch == '*' || ch == '"' || ch == '\'' || ch == '`')
            .trim();
        if headline.is_empty() {
            return ReportVerdict::Malformed;
        }
        return ReportVerdict::Accepted(headline.to_string());
    }

    ReportVerdict::Malformed
}
