//! 改写请求构造

use super::error::{RewriteError, RewriteResult};
use super::types::{Age, Profession, RewriteParams};

/// 生成系统指令
///
/// 要求服务按读者的年龄和职业调整用词、忽略导航类文字、附上问答，
/// 并保持原文语言。未选择职业时省略职业部分。
pub fn system_instruction(age: Age, profession: Profession) -> String {
    let reader = if profession.is_specified() {
        format!("a person of age {} and profession {}", age, profession)
    } else {
        format!("a person of age {}", age)
    };

    format!(
        "The provided input represents a part of textContents extracted from a web article. \
         It is a text object as it appears on the page. Text irrelevant to the main article, \
         such as navigational labels, should be ignored. For {reader}, use vocabulary and \
         explanations suitable for their age group and profession to aid their understanding. \
         Consider questions they might ask and create a Q&A with answers to help them \
         understand the text. Return as a text object. You must respect and maintain the \
         original language of the text in the rewritten text as well.\
         しかしなるべく日本語でお願いします。"
    )
}

/// 发往改写服务的请求
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteRequest {
    pub api_key: String,
    pub model: String,
    pub system_instruction: String,
    pub user_content: String,
    pub commit: bool,
}

impl RewriteRequest {
    /// 根据选区 HTML 和调用参数构造请求
    ///
    /// 空跑模式没有远程模型，构造会失败。
    pub fn new(serialized_html: &str, params: &RewriteParams) -> RewriteResult<Self> {
        let model = params.model.model_id().ok_or_else(|| {
            RewriteError::Config("空跑模式不调用远程服务".to_string())
        })?;

        if params.api_key.trim().is_empty() {
            return Err(RewriteError::Config("缺少 API 密钥".to_string()));
        }

        Ok(Self {
            api_key: params.api_key.clone(),
            model: model.to_string(),
            system_instruction: system_instruction(params.age, params.profession),
            user_content: serialized_html.to_string(),
            commit: params.commit,
        })
    }
}
