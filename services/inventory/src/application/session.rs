//! 会话日志
//!
//! 一次扫码会话中成功处理的 "名称 SN 序列号" 行，供交接单生成使用。

/// 会话日志
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionLog {
    lines: Vec<String>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format_line(label: &str, serial: &str) -> String {
        format!("{label} SN {serial}")
    }

    pub fn record(&mut self, label: &str, serial: &str) {
        self.lines.push(Self::format_line(label, serial));
    }

    /// 移除最近一条匹配的行（撤销时调用），返回是否移除
    pub fn remove_last(&mut self, label: &str, serial: &str) -> bool {
        let line = Self::format_line(label, serial);
        match self.lines.iter().rposition(|l| *l == line) {
            Some(position) => {
                self.lines.remove(position);
                true
            }
            None => false,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_remove_last() {
        let mut session = SessionLog::new();
        session.record("Drill", "A1");
        session.record("Saw", "B2");
        session.record("Drill", "A1");

        assert!(session.remove_last("Drill", "A1"));
        assert_eq!(session.lines(), ["Drill SN A1", "Saw SN B2"]);
        assert!(!session.remove_last("Hammer", "C3"));
    }

    #[test]
    fn test_clear() {
        let mut session = SessionLog::new();
        session.record("Drill", "A1");
        session.clear();
        assert!(session.is_empty());
    }
}
