use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::Error;
use crate::models::StoredFile;
use crate::storage::FileStorage;

const DEFAULT_DESCRIPTION: &str = "Media library assets download";

/// Builds byte-stream download responses with safe content-disposition
/// naming: an ASCII fallback plus the UTF-8 extended filename.
pub struct FileResponseBuilder {
    storage: Arc<dyn FileStorage>,
}

impl FileResponseBuilder {
    pub fn new(storage: Arc<dyn FileStorage>) -> Self {
        Self { storage }
    }

    pub fn build(
        &self,
        file: &StoredFile,
        description: Option<&str>,
        download_name: Option<&str>,
    ) -> Result<Response, Error> {
        let contents = self
            .storage
            .read(&file.uri)
            .map_err(|_| Error::not_found(format!("file {}", file.uri)))?;

        let download_name = download_name.unwrap_or(&file.filename);
        // Filesystem basename as the last-resort plain name.
        let fallback = file
            .uri
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or(&file.filename);

        let disposition = content_disposition(download_name, fallback);

        let response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, file.filemime.clone())
            .header(header::CONTENT_LENGTH, contents.len())
            .header(
                header::CONTENT_DISPOSITION,
                HeaderValue::from_str(&disposition)
                    .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
            )
            .header(
                "Content-Description",
                HeaderValue::from_str(description.unwrap_or(DEFAULT_DESCRIPTION))
                    .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_DESCRIPTION)),
            )
            .body(Body::from(contents))
            .expect("response builder with valid headers");

        Ok(response)
    }
}

fn content_disposition(download_name: &str, fallback: &str) -> String {
    let ascii = transliterate(fallback);
    let extended = utf8_percent_encode(download_name, NON_ALPHANUMERIC).to_string();
    format!("attachment; filename=\"{ascii}\"; filename*=UTF-8''{extended}")
}

/// Strip diacritics from common Latin letters and squash everything else
/// non-ASCII, so the plain `filename` parameter stays header-safe.
pub fn transliterate(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'È' | 'É' | 'Ê' | 'Ë' => 'E',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
            'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => 'O',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            'ñ' => 'n',
            'Ñ' => 'N',
            'ý' | 'ÿ' => 'y',
            'Ý' => 'Y',
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transliterate_strips_diacritics() {
        assert_eq!(transliterate("Résumé.pdf"), "Resume.pdf");
        assert_eq!(transliterate("Señor año.zip"), "Senor ano.zip");
        assert_eq!(transliterate("plain-name.jpg"), "plain-name.jpg");
    }

    #[test]
    fn transliterate_squashes_unknown_and_quotes() {
        assert_eq!(transliterate("写真.png"), "__.png");
        assert_eq!(transliterate("a\"b\\c"), "a_b_c");
    }

    #[test]
    fn content_disposition_carries_both_names() {
        let header = content_disposition("Résumé.zip", "Résumé.zip");
        assert!(header.starts_with("attachment; filename=\"Resume.zip\""));
        assert!(header.contains("filename*=UTF-8''R%C3%A9sum%C3%A9%2Ezip"));
    }
}
