use crate::types::{ConfigError, ConfigResult};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;

/// ファイルパスからBufReaderを作成する
/// パースやデータ変換は呼び出し側で行う
pub fn load_file(file_path: &str) -> ConfigResult<BufReader<File>> {
    let file =
        File::open(file_path).map_err(|e| ConfigError::unreadable_settings_file(file_path, e))?;
    Ok(BufReader::new(file))
}

/// YAMLファイルからSerdeでDeserializeできる型を読み込む
pub fn load_yaml_from_file<T: DeserializeOwned>(file_path: &str) -> ConfigResult<T> {
    let buf_reader = load_file(file_path)?;
    serde_yaml::from_reader(buf_reader)
        .map_err(|e| ConfigError::malformed_settings_file(file_path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
    }

    #[test]
    fn test_load_non_existing_file() {
        // 存在しないファイルでエラーになることを確認
        let result = load_file("non_existent_file.txt");
        assert!(
            matches!(result, Err(ConfigError::UnreadableSettingsFile { .. })),
            "存在しないファイルでエラーにならなかった"
        );
    }

    #[test]
    fn test_load_yaml_from_file() {
        let path = std::env::temp_dir().join("notion_blog_loader_sample.yaml");
        fs::write(&path, "name: blog\n").expect("テストファイルの作成に失敗");

        let sample: Sample = load_yaml_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(sample.name, "blog");

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_invalid_yaml() {
        let path = std::env::temp_dir().join("notion_blog_loader_invalid.yaml");
        fs::write(&path, "name: [unclosed\n").expect("テストファイルの作成に失敗");

        let result: ConfigResult<Sample> = load_yaml_from_file(path.to_str().unwrap());
        assert!(matches!(result, Err(ConfigError::MalformedSettingsFile { .. })));

        fs::remove_file(&path).ok();
    }
}
