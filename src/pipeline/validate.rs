use crate::error::{AppError, AppResult, RequiredField};
use crate::model::{FileRef, GenerationRequest};

fn file_present(file: &Option<FileRef>) -> bool {
    file.as_ref().is_some_and(|f| !f.is_empty())
}

fn text_present(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Checks required fields in their fixed order and names the first one
/// missing. File contents are left to the backend.
pub fn validate(request: &GenerationRequest) -> AppResult<()> {
    let checks: Vec<(RequiredField, bool)> = match request {
        GenerationRequest::Questions(req) => vec![
            (RequiredField::InputCsv, file_present(&req.input_csv)),
            (RequiredField::BusinessName, text_present(&req.business_name)),
            (RequiredField::Credential, text_present(&req.credential)),
        ],
        GenerationRequest::Swot(req) => vec![
            (RequiredField::InputCsv, file_present(&req.input_csv)),
            (RequiredField::InputPdf, file_present(&req.input_pdf)),
            (RequiredField::BusinessName, text_present(&req.business_name)),
            (RequiredField::Credential, text_present(&req.credential)),
        ],
    };

    match checks.into_iter().find(|(_, present)| !present) {
        Some((field, _)) => Err(AppError::Validation { field }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionsRequest, SwotRequest};

    fn swot(
        csv: Option<FileRef>,
        pdf: Option<FileRef>,
        business_name: &str,
        credential: &str,
    ) -> GenerationRequest {
        GenerationRequest::Swot(SwotRequest {
            input_csv: csv,
            input_pdf: pdf,
            business_name: business_name.to_string(),
            credential: credential.to_string(),
        })
    }

    fn questions(csv: Option<FileRef>, business_name: &str, credential: &str) -> GenerationRequest {
        GenerationRequest::Questions(QuestionsRequest {
            input_csv: csv,
            business_name: business_name.to_string(),
            credential: credential.to_string(),
        })
    }

    fn missing(request: &GenerationRequest) -> Option<RequiredField> {
        match validate(request) {
            Err(AppError::Validation { field }) => Some(field),
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(()) => None,
        }
    }

    #[test]
    fn test_complete_requests_pass() {
        let csv = Some(FileRef::path("acme.csv"));
        let pdf = Some(FileRef::path("qa.pdf"));
        tokio_test::assert_ok!(validate(&questions(csv.clone(), "Acme Corp", "sk-test")));
        tokio_test::assert_ok!(validate(&swot(csv, pdf, "Acme Corp", "sk-test")));
    }

    #[test]
    fn test_questions_field_order() {
        let csv = Some(FileRef::path("acme.csv"));
        assert_eq!(
            missing(&questions(None, "", "")),
            Some(RequiredField::InputCsv)
        );
        assert_eq!(
            missing(&questions(csv.clone(), "", "")),
            Some(RequiredField::BusinessName)
        );
        assert_eq!(
            missing(&questions(csv, "Acme Corp", "")),
            Some(RequiredField::Credential)
        );
    }

    #[test]
    fn test_swot_field_order() {
        let csv = Some(FileRef::path("acme.csv"));
        let pdf = Some(FileRef::path("qa.pdf"));
        assert_eq!(
            missing(&swot(None, None, "Acme Corp", "sk-test")),
            Some(RequiredField::InputCsv)
        );
        assert_eq!(
            missing(&swot(csv.clone(), None, "", "")),
            Some(RequiredField::InputPdf)
        );
        assert_eq!(
            missing(&swot(csv.clone(), pdf.clone(), " ", "sk-test")),
            Some(RequiredField::BusinessName)
        );
        assert_eq!(
            missing(&swot(csv, pdf, "Acme Corp", "\t")),
            Some(RequiredField::Credential)
        );
    }

    #[test]
    fn test_swot_missing_pdf_names_input_pdf() {
        let request = swot(
            Some(FileRef::path("acme.csv")),
            None,
            "Acme Corp",
            "sk-test",
        );
        let err = validate(&request).unwrap_err();
        assert_eq!(
            err,
            AppError::Validation {
                field: RequiredField::InputPdf
            }
        );
        assert_eq!(err.to_string(), "Validation error: missing required field inputPdf");
    }

    #[test]
    fn test_empty_file_refs_count_as_missing() {
        assert_eq!(
            missing(&questions(Some(FileRef::path("  ")), "Acme Corp", "sk-test")),
            Some(RequiredField::InputCsv)
        );
        assert_eq!(
            missing(&questions(
                Some(FileRef::blob("acme.csv", Vec::<u8>::new())),
                "Acme Corp",
                "sk-test"
            )),
            Some(RequiredField::InputCsv)
        );
    }
}
