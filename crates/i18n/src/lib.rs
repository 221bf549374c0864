use std::collections::BTreeMap;

use core_types::UiLanguage;

#[derive(Debug, Clone)]
pub struct I18n {
    lang: UiLanguage,
    zh_cn: BTreeMap<&'static str, &'static str>,
    en_us: BTreeMap<&'static str, &'static str>,
}

impl I18n {
    pub fn new(lang: UiLanguage) -> Self {
        Self {
            lang,
            zh_cn: zh_cn_map(),
            en_us: en_us_map(),
        }
    }

    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        match self.lang {
            UiLanguage::ZhCn => self
                .zh_cn
                .get(key)
                .copied()
                .or_else(|| self.en_us.get(key).copied())
                .unwrap_or(key),
            UiLanguage::EnUs => self
                .en_us
                .get(key)
                .copied()
                .or_else(|| self.zh_cn.get(key).copied())
                .unwrap_or(key),
        }
    }

    /// Translated text followed by `: detail` when a detail is present.
    pub fn describe(&self, key: &str, detail: &str) -> String {
        if detail.is_empty() {
            self.t(key).to_string()
        } else {
            format!("{}: {detail}", self.t(key))
        }
    }
}

fn zh_cn_map() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([
        ("app.title", "PdfChat"),
        ("app.help", "命令: /login /register /upload /files /remove /send /docs /select /load /history /new /logout /quit"),
        ("chat.placeholder", "输入问题后回车发送"),
        ("chat.sent", "已发送"),
        ("chat.empty", "暂无对话"),
        ("upload.ready", "待上传"),
        ("upload.done", "上传成功"),
        ("docs.empty", "暂无文档"),
        ("docs.content", "文档内容"),
        ("sidebar.title", "聊天记录"),
        ("auth.logged_in", "登录成功"),
        ("auth.registered", "注册成功"),
        ("notify.history_failed", "获取聊天记录失败"),
        ("notify.send_failed", "发送消息失败"),
        ("notify.documents_failed", "获取文档列表失败"),
        ("notify.no_document_selected", "未选择文档"),
        ("notify.document_text_failed", "读取文档失败"),
        ("notify.upload_failed", "上传失败"),
        ("notify.questions_failed", "获取聊天问题失败"),
        ("notify.new_chat_failed", "创建新会话失败"),
        ("notify.logout_failed", "退出登录失败"),
        ("notify.auth_failed", "认证失败"),
        ("notify.file_unreadable", "无法读取文件"),
    ])
}

fn en_us_map() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([
        ("app.title", "PdfChat"),
        (
            "app.help",
            "commands: /login /register /upload /files /remove /send /docs /select /load /history /new /logout /quit",
        ),
        ("chat.placeholder", "Type a message and press Enter"),
        ("chat.sent", "Message sent"),
        ("chat.empty", "No messages yet"),
        ("upload.ready", "Ready to upload"),
        ("upload.done", "Successfully uploaded"),
        ("docs.empty", "No documents"),
        ("docs.content", "Document Content"),
        ("sidebar.title", "Chat History"),
        ("auth.logged_in", "Login successful"),
        ("auth.registered", "Registration successful"),
        ("notify.history_failed", "Error fetching chat history"),
        ("notify.send_failed", "Error sending message"),
        ("notify.documents_failed", "Error fetching documents"),
        ("notify.no_document_selected", "No document selected"),
        ("notify.document_text_failed", "Error reading document"),
        ("notify.upload_failed", "Upload failed"),
        ("notify.questions_failed", "Error fetching chat questions"),
        ("notify.new_chat_failed", "Failed to create chat session"),
        ("notify.logout_failed", "Logout failed"),
        ("notify.auth_failed", "Authentication failed"),
        ("notify.file_unreadable", "Cannot read file"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_chinese_translation() {
        let i18n = I18n::new(UiLanguage::ZhCn);
        assert_eq!(i18n.t("sidebar.title"), "聊天记录");
    }

    #[test]
    fn falls_back_to_key_when_missing() {
        let i18n = I18n::new(UiLanguage::EnUs);
        assert_eq!(i18n.t("not.exists"), "not.exists");
    }

    #[test]
    fn describe_appends_detail() {
        let i18n = I18n::new(UiLanguage::EnUs);
        assert_eq!(
            i18n.describe("notify.document_text_failed", "not found"),
            "Error reading document: not found"
        );
        assert_eq!(i18n.describe("notify.no_document_selected", ""), "No document selected");
    }

    #[test]
    fn both_languages_cover_the_same_keys() {
        let zh: Vec<_> = zh_cn_map().into_keys().collect();
        let en: Vec<_> = en_us_map().into_keys().collect();
        assert_eq!(zh, en);
    }
}
