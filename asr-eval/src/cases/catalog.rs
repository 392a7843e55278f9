//! In-memory store of test cases and vendors

use async_trait::async_trait;
use indexmap::IndexMap;

use super::loader::CatalogError;
use super::{
    LookupError, TestCaseId, TestCaseLookup, TestCaseRef, VendorDescriptor, VendorId,
    VendorLookup,
};

/// Test cases and vendors keyed by id, in insertion order
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    test_cases: IndexMap<TestCaseId, TestCaseRef>,
    vendors: IndexMap<VendorId, VendorDescriptor>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a test case. A blank name is replaced with `case-{id}`.
    pub fn insert_test_case(&mut self, mut test_case: TestCaseRef) -> Result<(), CatalogError> {
        if test_case.name.trim().is_empty() {
            test_case.name = TestCaseRef::default_name(test_case.id);
        }
        if self.test_cases.contains_key(&test_case.id) {
            return Err(CatalogError::DuplicateId {
                entity: "test case",
                id: test_case.id,
            });
        }
        self.test_cases.insert(test_case.id, test_case);
        Ok(())
    }

    pub fn insert_vendor(&mut self, vendor: VendorDescriptor) -> Result<(), CatalogError> {
        if self.vendors.contains_key(&vendor.id) {
            return Err(CatalogError::DuplicateId {
                entity: "vendor",
                id: vendor.id,
            });
        }
        self.vendors.insert(vendor.id, vendor);
        Ok(())
    }

    /// Move everything from `other` into this catalog
    pub fn merge(&mut self, other: Catalog) -> Result<(), CatalogError> {
        for (_, test_case) in other.test_cases {
            self.insert_test_case(test_case)?;
        }
        for (_, vendor) in other.vendors {
            self.insert_vendor(vendor)?;
        }
        Ok(())
    }

    pub fn test_cases(&self) -> impl Iterator<Item = &TestCaseRef> {
        self.test_cases.values()
    }

    pub fn vendors(&self) -> impl Iterator<Item = &VendorDescriptor> {
        self.vendors.values()
    }

    /// Test cases in `language` (exact match) carrying every tag in `tags`.
    ///
    /// `None` and an empty tag list do not filter.
    pub fn test_cases_matching<'a>(
        &'a self,
        language: Option<&'a str>,
        tags: &'a [String],
    ) -> impl Iterator<Item = &'a TestCaseRef> + 'a {
        self.test_cases
            .values()
            .filter(move |case| case.matches(language, tags))
    }

    pub fn test_case_ids(&self) -> Vec<TestCaseId> {
        self.test_cases.keys().copied().collect()
    }

    pub fn vendor_ids(&self) -> Vec<VendorId> {
        self.vendors.keys().copied().collect()
    }

    pub fn get_test_case(&self, id: TestCaseId) -> Option<&TestCaseRef> {
        self.test_cases.get(&id)
    }

    pub fn get_vendor(&self, id: VendorId) -> Option<&VendorDescriptor> {
        self.vendors.get(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.test_cases.is_empty() && self.vendors.is_empty()
    }
}

#[async_trait]
impl TestCaseLookup for Catalog {
    async fn test_case(&self, id: TestCaseId) -> Result<TestCaseRef, LookupError> {
        self.get_test_case(id)
            .cloned()
            .ok_or_else(|| LookupError::test_case_not_found(id))
    }
}

#[async_trait]
impl VendorLookup for Catalog {
    async fn vendor(&self, id: VendorId) -> Result<VendorDescriptor, LookupError> {
        self.get_vendor(id)
            .cloned()
            .ok_or_else(|| LookupError::vendor_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::VendorKind;

    fn sample() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.insert_test_case(TestCaseRef::new(3, "c.wav")).unwrap();
        catalog.insert_test_case(TestCaseRef::new(1, "a.wav")).unwrap();
        catalog
            .insert_vendor(VendorDescriptor::new(10, "MockASR", VendorKind::Mock))
            .unwrap();
        catalog
    }

    #[test]
    fn test_ids_keep_insertion_order() {
        let catalog = sample();
        assert_eq!(catalog.test_case_ids(), vec![3, 1]);
        assert_eq!(catalog.vendor_ids(), vec![10]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut catalog = sample();
        let err = catalog.insert_test_case(TestCaseRef::new(1, "other.wav")).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId { id: 1, .. }));

        let mut other = Catalog::new();
        other
            .insert_vendor(VendorDescriptor::new(10, "again", VendorKind::Replay))
            .unwrap();
        assert!(catalog.merge(other).is_err());
    }

    #[test]
    fn test_blank_names_get_default() {
        let mut catalog = Catalog::new();
        catalog
            .insert_test_case(TestCaseRef::new(4, "d.wav").with_name(""))
            .unwrap();
        catalog
            .insert_test_case(TestCaseRef::new(5, "e.wav").with_name("kept"))
            .unwrap();
        assert_eq!(catalog.get_test_case(4).unwrap().name, "case-4");
        assert_eq!(catalog.get_test_case(5).unwrap().name, "kept");
    }

    #[test]
    fn test_filter_by_language_and_tags() {
        let mut catalog = Catalog::new();
        let tagged = |id, lang: &str, tags: &[&str]| {
            let mut case = TestCaseRef::new(id, format!("{}.wav", id)).with_language(lang);
            case.tags = tags.iter().map(|t| t.to_string()).collect();
            case
        };
        catalog.insert_test_case(tagged(1, "en-US", &["short_audio", "noise"])).unwrap();
        catalog.insert_test_case(tagged(2, "en-US", &["short_audio"])).unwrap();
        catalog.insert_test_case(tagged(3, "zh-CN", &["short_audio", "noise"])).unwrap();
        catalog.insert_test_case(TestCaseRef::new(4, "4.wav")).unwrap();

        let ids = |language: Option<&str>, tags: &[&str]| -> Vec<TestCaseId> {
            let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
            catalog
                .test_cases_matching(language, &tags)
                .map(|c| c.id)
                .collect()
        };

        assert_eq!(ids(None, &[]), vec![1, 2, 3, 4]);
        assert_eq!(ids(Some("en-US"), &[]), vec![1, 2]);
        assert_eq!(ids(None, &["noise"]), vec![1, 3]);
        assert_eq!(ids(Some("en-US"), &["noise", "short_audio"]), vec![1]);
        assert_eq!(ids(Some("en"), &[]), Vec::<TestCaseId>::new());
    }

    #[tokio::test]
    async fn test_lookups() {
        let catalog = sample();
        assert_eq!(catalog.test_case(3).await.unwrap().audio_ref, "c.wav");
        assert_eq!(catalog.vendor(10).await.unwrap().name, "MockASR");
        assert_eq!(
            catalog.test_case(2).await.unwrap_err(),
            LookupError::test_case_not_found(2)
        );
        assert_eq!(
            catalog.vendor(11).await.unwrap_err(),
            LookupError::vendor_not_found(11)
        );
    }
}
