use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "regno": "REG123",
        "name": "Alice Example",
        "designation": "Member",
        "department": "CSE",
        "year": "3"
    })
)]
pub struct Member {
    #[schema(example = "REG123")]
    pub regno: String,

    #[schema(example = "Alice Example")]
    pub name: String,

    #[schema(example = "Member", nullable = true)]
    pub designation: Option<String>,

    #[schema(example = "CSE", nullable = true)]
    pub department: Option<String>,

    #[schema(example = "3", nullable = true)]
    pub year: Option<String>,
}

impl Member {
    /// Positional form used by the raw table dump.
    pub fn into_tuple(
        self,
    ) -> (String, String, Option<String>, Option<String>, Option<String>) {
        (self.regno, self.name, self.designation, self.department, self.year)
    }
}
