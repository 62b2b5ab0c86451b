//! 交接单生成

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use lager_errors::{AppError, AppResult};
use tracing::info;

use crate::domain::entities::STOCK_POSITION;
use crate::domain::enums::ScanMode;

/// 按名称分组的条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolGroup {
    pub label: String,
    pub serials: Vec<String>,
}

/// 交接单
#[derive(Debug, Clone)]
pub struct HandoverProtocol {
    mode: ScanMode,
    actor: Option<String>,
    organisation: String,
    created_at: DateTime<Utc>,
    groups: Vec<ProtocolGroup>,
    pages: Vec<Vec<String>>,
}

impl HandoverProtocol {
    /// 由会话日志行（"名称 SN 序列号"）构建
    ///
    /// 分组保持名称首次出现的顺序。
    pub fn build(
        lines: &[String],
        mode: ScanMode,
        actor: Option<&str>,
        organisation: &str,
        lines_per_page: usize,
    ) -> Self {
        let mut groups: Vec<ProtocolGroup> = Vec::new();
        for line in lines {
            let (label, serial) = match line.rsplit_once(" SN ") {
                Some((label, serial)) => (label.trim(), serial.trim()),
                None => (line.trim(), ""),
            };

            match groups.iter_mut().find(|g| g.label == label) {
                Some(group) => group.serials.push(serial.to_string()),
                None => groups.push(ProtocolGroup {
                    label: label.to_string(),
                    serials: vec![serial.to_string()],
                }),
            }
        }

        let rows: Vec<String> = groups
            .iter()
            .flat_map(|group| {
                std::iter::once(format!("{} ({})", group.label, group.serials.len())).chain(
                    group
                        .serials
                        .iter()
                        .filter(|s| !s.is_empty())
                        .map(|s| format!("    SN {s}")),
                )
            })
            .collect();

        let pages = if rows.is_empty() {
            vec![Vec::new()]
        } else {
            rows.chunks(lines_per_page.max(1)).map(<[String]>::to_vec).collect()
        };

        Self {
            mode,
            actor: actor.map(str::to_string),
            organisation: organisation.to_string(),
            created_at: Utc::now(),
            groups,
            pages,
        }
    }

    pub fn groups(&self) -> &[ProtocolGroup] {
        &self.groups
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// 条目总数
    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|g| g.serials.len()).sum()
    }

    fn title(&self) -> &'static str {
        match self.mode {
            ScanMode::CheckOut => "Handover protocol (issue)",
            ScanMode::CheckIn => "Handover protocol (return)",
        }
    }

    /// 签字栏：出库时仓库交出、持有人接收；入库相反
    fn signature_block(&self) -> Vec<String> {
        let holder = self.actor.as_deref().unwrap_or("");
        let warehouse = if self.organisation.is_empty() {
            STOCK_POSITION.to_string()
        } else {
            format!("{} ({})", self.organisation, STOCK_POSITION)
        };
        let (handed_over_by, received_by) = match self.mode {
            ScanMode::CheckOut => (warehouse, holder.to_string()),
            ScanMode::CheckIn => (holder.to_string(), warehouse),
        };

        vec![
            format!("Handed over by: {handed_over_by}"),
            "Signature: ______________________________".to_string(),
            String::new(),
            format!("Received by: {received_by}"),
            "Signature: ______________________________".to_string(),
        ]
    }

    pub fn render_text(&self) -> String {
        let total = self.pages.len();
        let mut out = String::new();

        for (number, page) in self.pages.iter().enumerate() {
            if !self.organisation.is_empty() {
                out.push_str(&self.organisation);
                out.push('\n');
            }
            out.push_str(self.title());
            out.push('\n');
            out.push_str(&format!(
                "Date: {}    Page {}/{}\n",
                self.created_at.format("%Y-%m-%d %H:%M"),
                number + 1,
                total
            ));
            out.push_str(&"-".repeat(48));
            out.push('\n');

            for row in page {
                out.push_str(row);
                out.push('\n');
            }

            if number + 1 == total {
                out.push('\n');
                out.push_str(&format!("Total items: {}\n\n", self.item_count()));
                for line in self.signature_block() {
                    out.push_str(&line);
                    out.push('\n');
                }
            } else {
                out.push('\u{c}');
                out.push('\n');
            }
        }

        out
    }

    pub fn file_name(&self) -> String {
        format!(
            "protocol-{}-{}.txt",
            self.mode.as_str(),
            self.created_at.format("%Y%m%d-%H%M%S")
        )
    }

    /// 写入目录，返回文件路径
    pub async fn write_to(&self, dir: impl AsRef<Path>) -> AppResult<PathBuf> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::internal(format!("Failed to create {}: {}", dir.display(), e)))?;

        let path = dir.join(self.file_name());
        tokio::fs::write(&path, self.render_text())
            .await
            .map_err(|e| AppError::internal(format!("Failed to write {}: {}", path.display(), e)))?;

        info!(path = %path.display(), items = self.item_count(), "Handover protocol written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_groups_keep_first_seen_order() {
        let protocol = HandoverProtocol::build(
            &lines(&["Saw SN B2", "Drill SN A1", "Saw SN B3"]),
            ScanMode::CheckOut,
            Some("Alice"),
            "",
            30,
        );
        assert_eq!(
            protocol.groups(),
            [
                ProtocolGroup {
                    label: "Saw".into(),
                    serials: vec!["B2".into(), "B3".into()]
                },
                ProtocolGroup {
                    label: "Drill".into(),
                    serials: vec!["A1".into()]
                },
            ]
        );
        assert_eq!(protocol.item_count(), 3);
    }

    #[test]
    fn test_label_containing_sn_splits_on_last_marker() {
        let protocol =
            HandoverProtocol::build(&lines(&["Meter SN 5 SN X9"]), ScanMode::CheckIn, None, "", 30);
        assert_eq!(protocol.groups()[0].label, "Meter SN 5");
        assert_eq!(protocol.groups()[0].serials, vec!["X9"]);
    }

    #[test]
    fn test_pagination() {
        let raw: Vec<String> = (0..5).map(|i| format!("Clamp SN C{i}")).collect();
        // 1 行分组标题 + 5 行序列号
        let protocol = HandoverProtocol::build(&raw, ScanMode::CheckOut, Some("Bob"), "", 4);
        assert_eq!(protocol.page_count(), 2);
        assert!(protocol.render_text().contains("Page 2/2"));
    }

    #[test]
    fn test_signature_roles_follow_mode() {
        let issue = HandoverProtocol::build(
            &lines(&["Drill SN A1"]),
            ScanMode::CheckOut,
            Some("Alice"),
            "Werkstatt",
            30,
        )
        .render_text();
        assert!(issue.contains("Handed over by: Werkstatt (Lager)"));
        assert!(issue.contains("Received by: Alice"));

        let ret = HandoverProtocol::build(
            &lines(&["Drill SN A1"]),
            ScanMode::CheckIn,
            Some("Alice"),
            "Werkstatt",
            30,
        )
        .render_text();
        assert!(ret.contains("Handed over by: Alice"));
        assert!(ret.contains("Received by: Werkstatt (Lager)"));
    }

    #[tokio::test]
    async fn test_write_to_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let protocol =
            HandoverProtocol::build(&lines(&["Drill SN A1"]), ScanMode::CheckOut, Some("Alice"), "", 30);

        let path = protocol.write_to(dir.path().join("out")).await.unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("protocol-check-out-"));
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("Drill (1)"));
        assert!(content.contains("SN A1"));
    }
}
