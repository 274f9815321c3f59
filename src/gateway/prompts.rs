use serde_json::{Value, json};

use super::lang::Lang;
use crate::session::RECENT_YEARS;

pub fn summary(query: &str, lang: Lang) -> String {
    lang.apply_to_prompt(&format!(
        "You are a helpful research assistant. Based on the search results, write a concise \
         one-paragraph summary answering the user's query: \"{query}\". Do not list the sources \
         in your answer, only provide the summary text. If the results are irrelevant or empty, \
         state that you could not find relevant information."
    ))
}

pub fn cover_image(title: &str) -> String {
    format!(
        "Create a visually striking, photorealistic book cover for a document titled: \"{title}\". \
         The style should be elegant, classic, and academic. Minimalist design. The cover must not \
         contain any text or letters. Focus on symbolic imagery related to the title."
    )
}

pub fn enrichment(titles: &[String], query: &str, current_year: i32, lang: Lang) -> String {
    let oldest = current_year - RECENT_YEARS;
    let mut prompt = format!(
        "For the following list of document titles, provide a detailed analysis of EACH document \
         based on the user's query: \"{query}\". Your answer MUST be a JSON array where each object \
         corresponds to one title, in the same order. Each object must have:\n\
         - \"rating\": a number from 1 to 5 (may be fractional) representing relevance to the query.\n\
         - \"tags\": an array of 3-5 short descriptive keyword strings.\n\
         - \"briefSummary\": a single concise sentence summarizing the document's likely content based on its title.\n\
         - \"publicationYear\": an INTEGER with the estimated publication year.\n\
         - \"validityRating\": a validity grade following the Qualis CAPES scale (e.g. \"A1\", \"A2\", \"B1\", \"B2\", \"C\"). \
         Give a high grade (A1-B2) only if the document looks academic and recent (published from {oldest} to {current_year}). \
         Otherwise use \"C\" or \"N/A\".\n\n\
         Document titles:\n"
    );
    for (i, title) in titles.iter().enumerate() {
        prompt.push_str(&format!("{}. {title}\n", i + 1));
    }
    lang.apply_to_prompt(&prompt)
}

pub fn correlation(titles: &[&str], lang: Lang) -> String {
    let mut prompt = String::from(
        "Analyze the following list of research documents. Group them into 2-4 thematic clusters \
         based on their titles. For each cluster, provide a \"theme\" title and a short \
         \"description\" explaining the connection. Structure your answer as a JSON object with a \
         \"clusters\" key. \"clusters\" is an array of objects, each with \"theme\", \"description\" \
         and \"nodes\". \"nodes\" is an array of objects with \"resultIndex\" (the original 0-based \
         index) and \"title\".\n\nDocuments:\n",
    );
    for (i, title) in titles.iter().enumerate() {
        prompt.push_str(&format!("{i}: {title}\n"));
    }
    lang.apply_to_prompt(&prompt)
}

pub fn article(works: &[(&str, &str)], lang: Lang) -> String {
    let mut list = String::new();
    for (title, url) in works {
        list.push_str(&format!("- Title: {title}\n  - URL: {url}\n"));
    }

    lang.apply_to_prompt(&format!(
        "You are an academic writing assistant and an expert in the ABNT standards.\n\
         Your task is to write a concise scientific article based on the list of works provided.\n\n\
         The article must follow this structure:\n\
         1. **Introdução:** Present the central theme connecting the works and the goal of the article.\n\
         2. **Desenvolvimento:** Discuss and synthesize the main ideas of the works, connecting them \
         coherently. Cite the works throughout the text where appropriate (a simplified author-date \
         format is fine, inferring the author from the title if needed).\n\
         3. **Conclusão:** Present a final synthesis of the ideas discussed and possible directions \
         for future research.\n\
         4. **Referências:** List ALL the works provided in a final section. This section is the most \
         important one. Format each entry STRICTLY according to the ABNT standards for articles, books \
         and internet sources.\n\n\
         **Response format:**\n\
         The answer MUST be an HTML document. Use semantic HTML tags (`<h1>`, `<h2>`, `<h3>`, `<p>`, \
         `<ul>`, `<li>`, etc.). Do not include `<html>`, `<head>` or `<body>` tags, only the content of \
         the article body. The main title must be an `<h1>`. Section titles must be `<h2>`. The \
         reference list must be an unordered list (`<ul>` and `<li>`).\n\n\
         **Selected works:**\n{list}\n\
         Start writing the article now."
    ))
}

pub fn enrichment_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "rating": {"type": "NUMBER", "description": "Relevance score from 1 to 5"},
                "tags": {"type": "ARRAY", "items": {"type": "STRING"}, "description": "Descriptive tags"},
                "briefSummary": {"type": "STRING", "description": "One-sentence summary"},
                "publicationYear": {"type": "INTEGER", "description": "Estimated publication year"},
                "validityRating": {"type": "STRING", "description": "Validity grade (Qualis scale)"}
            },
            "required": ["rating", "tags", "briefSummary", "publicationYear", "validityRating"]
        }
    })
}

pub fn correlation_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "clusters": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "theme": {"type": "STRING"},
                        "description": {"type": "STRING"},
                        "nodes": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "resultIndex": {"type": "INTEGER"},
                                    "title": {"type": "STRING"}
                                },
                                "required": ["resultIndex", "title"]
                            }
                        }
                    },
                    "required": ["theme", "description", "nodes"]
                }
            }
        },
        "required": ["clusters"]
    })
}
