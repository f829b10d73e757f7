pub const DEFAULT_TOPIC: &str =
    "Fairness, Accountability, Transparency and Ethics in Information Retrieval";

const ROLE: &str = "You are an information specialist who develops Boolean queries for \
systematic reviews. You have extensive experience building highly effective queries for \
searching the information retrieval literature, and your specialty is queries that retrieve \
all relevant documents for an information need while retrieving as few irrelevant ones as possible.";

const COLLECTION: &str = "The Boolean query is meant for the IR Anthology, a collection of all \
papers related to information retrieval research.";

const FIELDS: &str = "The IR Anthology has the following searchable index fields: full_text \
(searched by default), year, title, author, editor, doi.";

fn need(topic: &str) -> String {
    format!("Your information need is research on the topic of {topic}.")
}

pub(super) fn direct_query(topic: &str) -> String {
    format!(
        "{ROLE} {} Construct a highly effective systematic review Boolean query that best \
         serves this information need. {COLLECTION} Answer with the Boolean query only, \
         without explanations.",
        need(topic)
    )
}

pub(super) fn sub_topics(topic: &str) -> String {
    format!(
        "{ROLE} {} First, break the topic down into several relevant sub-topics and return \
         them as a list. Answer with the list of sub-topics only, without explanations.",
        need(topic)
    )
}

pub(super) fn synonyms(topic: &str, sub_topics: &str) -> String {
    format!(
        "{ROLE} {} These are sub-topics of the topic: {sub_topics}. Find relevant synonyms \
         for each sub-topic and return them as a list. Answer with the synonym list for each \
         sub-topic only, without explanations.",
        need(topic)
    )
}

pub(super) fn query_from_synonyms(topic: &str, synonyms: &str) -> String {
    format!(
        "{ROLE} {} These are sub-topics of the topic with their synonyms: {synonyms}. \
         Construct a highly effective systematic review Boolean query that best serves this \
         information need and uses the given synonyms. {COLLECTION} {FIELDS} Answer with the \
         Boolean query only, without explanations.",
        need(topic)
    )
}
