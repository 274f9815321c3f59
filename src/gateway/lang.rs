use serde::{Deserialize, Serialize};

/// Language of generated text and of the placeholders used when a call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    Pt,
    En,
}

impl Lang {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pt" | "pt-br" | "portuguese" => Some(Lang::Pt),
            "en" | "english" => Some(Lang::En),
            _ => None,
        }
    }

    pub fn apply_to_prompt(self, prompt: &str) -> String {
        match self {
            Lang::Pt => format!("{prompt}\n\nSua resposta deve ser em português."),
            Lang::En => format!("{prompt}\n\nYour answer must be in English."),
        }
    }

    pub fn untitled(self) -> &'static str {
        match self {
            Lang::Pt => "Sem título",
            Lang::En => "Untitled",
        }
    }

    pub fn analysis_failed_tag(self) -> &'static str {
        match self {
            Lang::Pt => "Análise Falhou",
            Lang::En => "Analysis Failed",
        }
    }

    pub fn summary_unavailable(self) -> &'static str {
        match self {
            Lang::Pt => "Não foi possível gerar o resumo.",
            Lang::En => "Could not generate the summary.",
        }
    }

    pub fn search_blocked_message(self) -> &'static str {
        match self {
            Lang::Pt => {
                "A resposta foi bloqueada devido a políticas de segurança. Por favor, tente uma consulta diferente."
            }
            Lang::En => {
                "The response was blocked by safety policies. Please try a different query."
            }
        }
    }

    pub fn search_failed_message(self) -> &'static str {
        match self {
            Lang::Pt => {
                "Não foi possível processar sua solicitação. Verifique sua consulta ou tente novamente mais tarde."
            }
            Lang::En => "Could not process your request. Check your query or try again later.",
        }
    }

    pub fn article_blocked_html(self) -> &'static str {
        match self {
            Lang::Pt => {
                "<h1>Erro de Segurança</h1><p>O conteúdo solicitado não pôde ser gerado devido às políticas de segurança. Por favor, tente com uma seleção diferente de obras.</p>"
            }
            Lang::En => {
                "<h1>Safety Error</h1><p>The requested content could not be generated due to safety policies. Please try a different selection of works.</p>"
            }
        }
    }

    pub fn article_failed_html(self) -> &'static str {
        match self {
            Lang::Pt => {
                "<h1>Erro na Geração</h1><p>Não foi possível gerar o artigo. Por favor, tente novamente mais tarde.</p>"
            }
            Lang::En => {
                "<h1>Generation Error</h1><p>The article could not be generated. Please try again later.</p>"
            }
        }
    }
}
