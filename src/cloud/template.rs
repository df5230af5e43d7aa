/// 对象键模板，支持`{basename}`（源文件名）与`{timestamp}`（Unix秒）两个占位符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTemplate(String);

impl KeyTemplate {
    pub const BASENAME: &'static str = "{basename}";
    pub const TIMESTAMP: &'static str = "{timestamp}";

    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn render(&self, basename: &str, timestamp: i64) -> String {
        self.0
            .replace(Self::BASENAME, basename)
            .replace(Self::TIMESTAMP, &timestamp.to_string())
    }

    pub fn render_now(&self, basename: &str) -> String {
        self.render(basename, chrono::Utc::now().timestamp())
    }
}

impl From<&str> for KeyTemplate {
    fn from(template: &str) -> Self {
        Self::new(template)
    }
}
