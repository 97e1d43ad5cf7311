//! Example data inserted into an empty store on first start.

use chrono::NaiveDate;

use super::Repository;
use crate::errors::AppError;
use crate::models::{NewGrant, NewTag};

struct SeedTag {
    name: &'static str,
    color: &'static str,
    description: &'static str,
}

const SEED_TAGS: &[SeedTag] = &[
    SeedTag {
        name: "Education",
        color: "#28a745",
        description: "Grants related to educational initiatives",
    },
    SeedTag {
        name: "Healthcare",
        color: "#dc3545",
        description: "Grants for healthcare and medical research",
    },
    SeedTag {
        name: "Technology",
        color: "#007bff",
        description: "Technology and innovation grants",
    },
    SeedTag {
        name: "Environment",
        color: "#20c997",
        description: "Environmental and sustainability grants",
    },
    SeedTag {
        name: "Arts",
        color: "#6f42c1",
        description: "Arts and culture grants",
    },
];

struct SeedGrant {
    title: &'static str,
    description: &'static str,
    amount: f64,
    deadline: (i32, u32, u32),
    organization: &'static str,
    contact_email: &'static str,
    website: &'static str,
    /// Indexes into `SEED_TAGS`
    tags: &'static [usize],
}

const SEED_GRANTS: &[SeedGrant] = &[
    SeedGrant {
        title: "STEM Education Initiative",
        description: "Supporting science, technology, engineering, and mathematics education in underserved communities",
        amount: 50000.0,
        deadline: (2024, 6, 30),
        organization: "Education Foundation",
        contact_email: "grants@edfoundation.org",
        website: "https://edfoundation.org",
        tags: &[0, 2],
    },
    SeedGrant {
        title: "Mental Health Research Grant",
        description: "Funding for innovative mental health research and treatment programs",
        amount: 75000.0,
        deadline: (2024, 8, 15),
        organization: "Health Research Institute",
        contact_email: "research@healthinstitute.org",
        website: "https://healthinstitute.org",
        tags: &[1],
    },
    SeedGrant {
        title: "Green Technology Innovation",
        description: "Supporting development of sustainable and environmentally friendly technologies",
        amount: 100000.0,
        deadline: (2024, 7, 20),
        organization: "Green Future Foundation",
        contact_email: "innovation@greenfuture.org",
        website: "https://greenfuture.org",
        tags: &[2, 3],
    },
];

/// Insert the example tags and grants when no tags exist yet.
///
/// Returns whether anything was inserted.
pub async fn seed_if_empty(repo: &Repository) -> Result<bool, AppError> {
    if repo.count_tags().await? > 0 {
        return Ok(false);
    }

    let mut tag_ids = Vec::with_capacity(SEED_TAGS.len());
    for seed in SEED_TAGS {
        let tag = repo
            .create_tag(&NewTag {
                name: seed.name.to_string(),
                color: seed.color.to_string(),
                description: Some(seed.description.to_string()),
            })
            .await?;
        tag_ids.push(tag.id);
    }

    for seed in SEED_GRANTS {
        let (year, month, day) = seed.deadline;
        repo.create_grant(&NewGrant {
            title: seed.title.to_string(),
            description: Some(seed.description.to_string()),
            amount: Some(seed.amount),
            deadline: NaiveDate::from_ymd_opt(year, month, day),
            status: None,
            organization: Some(seed.organization.to_string()),
            contact_email: Some(seed.contact_email.to_string()),
            website: Some(seed.website.to_string()),
            tag_ids: seed.tags.iter().map(|&i| tag_ids[i]).collect(),
        })
        .await?;
    }

    tracing::info!(
        "Seeded {} tags and {} grants",
        SEED_TAGS.len(),
        SEED_GRANTS.len()
    );
    Ok(true)
}
