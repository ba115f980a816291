// src/common/i18n.rs

use std::collections::HashMap;

pub const IDIOMA_PADRAO: &str = "pt";

// (chave, português, inglês)
const MENSAGENS: &[(&str, &str, &str)] = &[
    ("validacao", "Um ou mais campos são inválidos.", "One or more fields are invalid."),
    ("carregamento_finalizado", "Este carregamento já foi finalizado.", "This loading has already been finished."),
    ("sem_permissao_etapa", "Apenas o armazém responsável pode avançar esta etapa.", "Only the assigned warehouse can advance this stage."),
    ("etapa_incorreta", "Só é possível avançar a etapa atual do carregamento.", "Only the current stage of the loading can be advanced."),
    ("etapa_inexistente", "Etapa inexistente.", "Stage does not exist."),
    ("foto_obrigatoria", "É obrigatório anexar uma foto para concluir esta etapa.", "A photo is required to complete this stage."),
    ("nota_fiscal_obrigatoria", "É obrigatório anexar a nota fiscal em PDF.", "The invoice PDF is required."),
    ("anexo_invalido", "O arquivo enviado não é do tipo esperado.", "The uploaded file is not of the expected type."),
    ("historico_imutavel", "Esta etapa já foi registrada e não pode ser alterada.", "This stage has already been recorded and cannot be changed."),
    ("falha_upload", "Falha ao enviar o arquivo. Tente novamente.", "File upload failed. Please try again."),
    ("falha_persistencia", "Falha ao salvar a etapa. Nada foi alterado.", "Failed to save the stage. Nothing was changed."),
    ("etapa_desatualizada", "O carregamento foi alterado por outra pessoa. Recarregue a página.", "The loading was changed by someone else. Reload the page."),
    ("carregamento_nao_encontrado", "Carregamento não encontrado.", "Loading not found."),
    ("anexo_nao_encontrado", "Anexo não encontrado.", "Attachment not found."),
    ("acesso_negado", "Você não tem acesso a este carregamento.", "You do not have access to this loading."),
    ("token_invalido", "Token de autenticação inválido ou ausente.", "Invalid or missing authentication token."),
    ("usuario_sem_papel", "Usuário sem papel atribuído.", "User has no assigned role."),
    ("formulario_invalido", "Formulário inválido.", "Invalid form."),
    ("erro_interno", "Ocorreu um erro inesperado.", "An unexpected error occurred."),
];

/// Mensagens ao usuário em `pt` e `en`. Idiomas desconhecidos caem no português.
#[derive(Debug)]
pub struct I18nStore {
    mensagens: HashMap<&'static str, (&'static str, &'static str)>,
}

impl I18nStore {
    pub fn new() -> Self {
        let mensagens = MENSAGENS
            .iter()
            .map(|(chave, pt, en)| (*chave, (*pt, *en)))
            .collect();
        Self { mensagens }
    }

    pub fn get(&self, lang: &str, chave: &str) -> String {
        match self.mensagens.get(chave) {
            Some((_, en)) if lang == "en" => en.to_string(),
            Some((pt, _)) => pt.to_string(),
            None => chave.to_string(),
        }
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}
