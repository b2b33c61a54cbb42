//! Prompt templates for the six generation operations.
//!
//! Input shape is contractual (global plan with `[done]` markers, queries on
//! the path to the root, `---`-separated context); wording is not.

/// High-level plan generation.
pub fn research_plan(topic: &str) -> String {
    format!(
        "You are an expert deep-research agent, part of a multi-agent system.\n\
         \n\
         <User query>\n{topic}\n</User query>\n\
         \n\
         ---\n\
         Generate a few very high level steps on which other agents can run \
         info collection passes. Provide only data collection steps - no data \
         identification, summarization, manipulation or selection.\n\
         Do not presume any knowledge about the topic.\n\
         Return a string array of steps."
    )
}

/// Search query synthesis for the current plan step.
pub fn search_queries(
    vertical: &str,
    topic: &str,
    plan_done: &str,
    past_queries: &str,
    context: &str,
    n: usize,
) -> String {
    format!(
        "Based on the findings so far on the step \"{vertical}\", create web search queries.\n\
         <Original user query>\n{topic}\n</Original user query>\n\
         \n\
         <Global research plan>\n{plan_done}\n</Global research plan>\n\
         \n\
         <Past searched queries>\n{past_queries}\n</Past searched queries>\n\
         \n\
         <Findings under current topic>\n{context}\n</Findings under current topic>\n\
         \n\
         Suggest {n} specific search queries that:\n\
         - Cover what has not been covered yet\n\
         - Build upon these findings\n\
         - Explore different aspects\n\
         - Go deeper into important details\n\
         \n\
         - Do not do quote searches\n\
         - Queries should be generic and short\n\
         - Do not presume any knowledge about the topic\n\
         Return as a JSON array of query strings."
    )
}

/// Branch continuation decision.
pub fn continue_branch(plan_done: &str, query: &str, past_queries: &str, context: &str) -> String {
    format!(
        "Given the current state of research, decide whether to continue \
         exploring the current branch or not.\n\
         <Global research plan>\n{plan_done}\n</Global research plan>\n\
         \n\
         Current topic: {query}\n\
         \n\
         <Past searched queries>\n{past_queries}\n</Past searched queries>\n\
         \n\
         <Findings under current topic>\n{context}\n</Findings under current topic>\n\
         \n\
         Consider:\n\
         - Information saturation\n\
         - Information duplication\n\
         - Coverage of the current topic\n\
         - Potential for new insights\n\
         \n\
         Return only decision: true/false"
    )
}

/// Verbatim findings extraction from a batch of retrieved pages.
pub fn site_summary(query: &str, findings: &str) -> String {
    format!(
        "Extract and filter the following search results from the query \
         \"{query}\" to get important verbatim information. No small talk.\n\
         <findings>\n{findings}\n</findings>"
    )
}

/// Report outline generation.
pub fn report_outline(topic: &str, context: &str) -> String {
    format!(
        "Generate an outline for a report based on the findings:\n\
         <Original user query>\n{topic}\n</Original user query>\n\
         \n\
         <Findings>\n{context}\n</Findings>\n\
         \n\
         Deduplicate, reorganize and analyze the findings to create the outline.\n\
         If there are multiple comparisons, use a table instead of multiple headings.\n\
         The outline should include:\n\
         - Title\n\
         - List of h2 headings\n\
         Do not include hashtags."
    )
}

/// Per-heading report fill-in.
pub fn report_fillin(topic: &str, context: &str, outline_done: &str, heading: &str) -> String {
    format!(
        "Fill in the content for the current outline heading based on the findings:\n\
         <Original user query>\n{topic}\n</Original user query>\n\
         \n\
         <Findings>\n{context}\n</Findings>\n\
         \n\
         <The outline>\n{outline_done}\n</The outline>\n\
         \n\
         <Current outline heading to fill in>\n## {heading}\n...\n</Current outline heading to fill in>\n\
         \n\
         Assume [done] headings already have their respective content.\n\
         The content should be comprehensive, detailed and well-structured, \
         providing detailed information on the current heading.\n\
         If needed use tables and lists. Do not include subheadings.\n\
         Do not include the heading in the content."
    )
}

/// Marker passed in place of empty accumulated context; downstream prompts
/// are schema-driven and need an explicit field value.
pub const EMPTY_CONTEXT: &str = "None";

/// Join context fragments the way prompts expect them.
pub fn join_context(fragments: &[String]) -> String {
    if fragments.is_empty() {
        EMPTY_CONTEXT.to_string()
    } else {
        fragments.join("\n\n---\n\n")
    }
}

/// Render a list with `[done]` markers, one entry per line.
pub fn done_list(entries: &[String]) -> String {
    entries
        .iter()
        .map(|e| format!("[done] {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
