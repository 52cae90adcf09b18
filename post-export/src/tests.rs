#[cfg(test)]
mod tests {
    use crate::{
        fit_cell_text, sanitize_file_stem, Cell, ToRow, XlsxExporter, MAX_CELL_CHARS, POST_COLUMNS,
        TIMELINE_COLUMNS,
    };
    use chrono::DateTime;
    use crawler_core::{CoreError, ExportError, Post, PostSink, TimelinePost};
    use std::env;
    use std::path::PathBuf;

    fn test_output_dir() -> PathBuf {
        env::temp_dir().join(format!("test_weibo_export_{}", uuid::Uuid::new_v4()))
    }

    fn sample_post(id: &str) -> Post {
        Post {
            id: id.to_string(),
            user_name: "tester".to_string(),
            user_id: 1669879400,
            gender: "f".to_string(),
            publish_time: DateTime::parse_from_rfc3339("2022-06-15T10:00:00+08:00").unwrap(),
            text: format!("body of {}", id),
            like_count: 10,
            comment_count: 2,
            forward_count: 1,
            origin_publish_time: "Wed Jun 15 10:00:00 +0800 2022".to_string(),
        }
    }

    #[test]
    fn test_post_row_matches_columns() {
        let row = sample_post("4790001").to_row();
        assert_eq!(row.len(), POST_COLUMNS.len());
        assert_eq!(row[0], Cell::Text("4790001".to_string()));
        assert_eq!(row[2], Cell::Number(1669879400));
        assert_eq!(row[4], Cell::Text("2022-06-15 10:00:00".to_string()));
        assert_eq!(
            row[9],
            Cell::Text("Wed Jun 15 10:00:00 +0800 2022".to_string())
        );
    }

    #[test]
    fn test_timeline_row_matches_columns() {
        let post = TimelinePost {
            user_id: 7,
            id: "1".to_string(),
            text: "hello".to_string(),
            publish_time: DateTime::parse_from_rfc3339("2022-06-15T23:30:00+08:00").unwrap(),
            like_count: 1,
            comment_count: 0,
            forward_count: 0,
        };
        let row = post.to_row();
        assert_eq!(row.len(), TIMELINE_COLUMNS.len());
        assert_eq!(row[3], Cell::Text("2022-06-15 23:30:00".to_string()));
    }

    #[test]
    fn test_export_creates_directory_and_file() {
        let dir = test_output_dir();
        let mut exporter = XlsxExporter::new(&dir);

        exporter
            .write_posts("drought", &[sample_post("1"), sample_post("2")])
            .expect("Failed to export posts");

        let path = dir.join("drought.xlsx");
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_repeated_export_overwrites() {
        let dir = test_output_dir();
        let exporter = XlsxExporter::new(&dir);
        let posts = vec![sample_post("1"), sample_post("2")];

        let first = exporter.export("k", &POST_COLUMNS, &posts).unwrap();
        let second = exporter.export("k", &POST_COLUMNS, &posts).unwrap();

        assert_eq!(first, second);
        let files: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(files.len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_oversized_text_is_truncated_on_export() {
        let dir = test_output_dir();
        let mut exporter = XlsxExporter::new(&dir);
        let mut post = sample_post("1");
        post.text = "长".repeat(40_000);

        exporter
            .write_posts("long", &[post])
            .expect("Oversized body should still export");
        assert!(dir.join("long.xlsx").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_fit_cell_text_cuts_on_char_boundary() {
        let fitted = fit_cell_text("长".repeat(40_000), 1, 5);
        assert_eq!(fitted.chars().count(), MAX_CELL_CHARS);
        assert!(fitted.chars().all(|c| c == '长'));

        let exact = "a".repeat(MAX_CELL_CHARS);
        assert_eq!(fit_cell_text(exact.clone(), 1, 5), exact);
        assert_eq!(fit_cell_text("short".to_string(), 1, 5), "short");
    }

    #[test]
    fn test_timeline_export_named_by_uid() {
        let dir = test_output_dir();
        let mut exporter = XlsxExporter::new(&dir);

        exporter.write_timeline(1669879400, &[]).unwrap();
        assert!(dir.join("1669879400.xlsx").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_names_are_sanitized() {
        assert_eq!(sanitize_file_stem("西安交通大学"), "西安交通大学");
        assert_eq!(sanitize_file_stem("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_file_stem("  spaced  "), "spaced");
        assert_eq!(sanitize_file_stem(".."), "");

        let exporter = XlsxExporter::new("out");
        assert_eq!(
            exporter.path_for("../escape").unwrap(),
            PathBuf::from("out").join(".._escape.xlsx")
        );
        assert!(matches!(
            exporter.path_for(".."),
            Err(CoreError::Export(ExportError::InvalidPath { .. }))
        ));
    }
}
