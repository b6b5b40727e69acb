//! Hand-maintained datasets used when a platform offers no public feed or its
//! API is unreachable. Dates are day offsets from the run's clock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hacksync_core::{days_from, DateConfidence, HackathonMode, HackathonRecord, HackathonSource};
use hacksync_storage::HttpFetcher;
use tracing::info;

use crate::{AdapterContext, AdapterKind, SourceAdapter};

struct Seed {
    title: &'static str,
    description: &'static str,
    start_in_days: i64,
    end_in_days: i64,
    deadline_in_days: i64,
    registration_url: &'static str,
    mode: HackathonMode,
    location: &'static str,
    prize_pool: &'static str,
    image_url: Option<&'static str>,
    skills: [&'static str; 4],
}

impl Seed {
    fn build(&self, source: HackathonSource, now: DateTime<Utc>) -> HackathonRecord {
        HackathonRecord {
            title: self.title.to_string(),
            description: Some(self.description.to_string()),
            start_date: days_from(now, self.start_in_days),
            end_date: days_from(now, self.end_in_days),
            registration_deadline: days_from(now, self.deadline_in_days),
            registration_url: self.registration_url.to_string(),
            source,
            mode: self.mode,
            location: Some(self.location.to_string()),
            prize_pool: Some(self.prize_pool.to_string()),
            image_url: self.image_url.map(str::to_string),
            skills: self.skills.iter().map(|s| s.to_string()).collect(),
            date_confidence: DateConfidence::Parsed,
        }
    }
}

fn build_all(seeds: &[Seed], source: HackathonSource, now: DateTime<Utc>) -> Vec<HackathonRecord> {
    seeds.iter().map(|seed| seed.build(source, now)).collect()
}

const DEVFOLIO: [Seed; 3] = [
    Seed {
        title: "ETHIndia 2025",
        description: "Asia's largest Ethereum hackathon. \
                      Build the future of Web3 with 2000+ hackers.",
        start_in_days: 45,
        end_in_days: 47,
        deadline_in_days: 40,
        registration_url: "https://ethindia.co",
        mode: HackathonMode::Offline,
        location: "Bangalore, India",
        prize_pool: "₹50,00,000",
        image_url: Some("https://assets.devfolio.co/hackathons/ethindia/logo.png"),
        skills: ["Solidity", "Web3", "Ethereum", "React"],
    },
    Seed {
        title: "HackThisFall 5.0",
        description: "India's most welcoming hackathon. 48 hours of innovation and learning.",
        start_in_days: 30,
        end_in_days: 32,
        deadline_in_days: 25,
        registration_url: "https://hackthisfall.tech",
        mode: HackathonMode::Hybrid,
        location: "Virtual & Jaipur",
        prize_pool: "₹10,00,000",
        image_url: None,
        skills: ["JavaScript", "Python", "AI/ML", "Open Source"],
    },
    Seed {
        title: "Unfold 2025",
        description: "Coindcx's flagship Web3 hackathon. Build, learn, and win prizes.",
        start_in_days: 60,
        end_in_days: 62,
        deadline_in_days: 55,
        registration_url: "https://unfold.devfolio.co",
        mode: HackathonMode::Offline,
        location: "Bangalore, India",
        prize_pool: "₹25,00,000",
        image_url: None,
        skills: ["Blockchain", "DeFi", "Smart Contracts", "TypeScript"],
    },
];

const DEVPOST: [Seed; 3] = [
    Seed {
        title: "Google Solution Challenge 2025",
        description: "Build solutions using Google technologies \
                      to address UN Sustainable Development Goals.",
        start_in_days: 20,
        end_in_days: 90,
        deadline_in_days: 15,
        registration_url: "https://developers.google.com/community/gdsc-solution-challenge",
        mode: HackathonMode::Online,
        location: "Global",
        prize_pool: "$10,000",
        image_url: None,
        skills: ["Flutter", "Firebase", "Google Cloud", "Android"],
    },
    Seed {
        title: "Microsoft Imagine Cup 2025",
        description: "Global technology competition for students to solve real-world problems.",
        start_in_days: 25,
        end_in_days: 120,
        deadline_in_days: 20,
        registration_url: "https://imaginecup.microsoft.com",
        mode: HackathonMode::Online,
        location: "Global",
        prize_pool: "$100,000",
        image_url: None,
        skills: ["Azure", "AI/ML", ".NET", "Power Platform"],
    },
    Seed {
        title: "NASA Space Apps Challenge",
        description: "Annual hackathon using NASA data \
                      to solve challenges facing humanity and Earth.",
        start_in_days: 35,
        end_in_days: 37,
        deadline_in_days: 30,
        registration_url: "https://www.spaceappschallenge.org",
        mode: HackathonMode::Hybrid,
        location: "Global (200+ locations)",
        prize_pool: "$5,000",
        image_url: None,
        skills: ["Data Science", "Python", "JavaScript", "Space Tech"],
    },
];

const UNSTOP: [Seed; 3] = [
    Seed {
        title: "Smart India Hackathon 2025",
        description: "India's largest open innovation platform \
                      for students to solve government problems.",
        start_in_days: 50,
        end_in_days: 52,
        deadline_in_days: 45,
        registration_url: "https://www.sih.gov.in",
        mode: HackathonMode::Offline,
        location: "India (Multiple Nodal Centers)",
        prize_pool: "₹1,00,000",
        image_url: None,
        skills: ["IoT", "AI/ML", "Blockchain", "Mobile Apps"],
    },
    Seed {
        title: "Flipkart GRiD 6.0",
        description: "Annual engineering excellence challenge by Flipkart for students.",
        start_in_days: 40,
        end_in_days: 42,
        deadline_in_days: 35,
        registration_url: "https://unstop.com/hackathons/flipkart-grid",
        mode: HackathonMode::Online,
        location: "Virtual",
        prize_pool: "₹3,00,000",
        image_url: None,
        skills: ["DSA", "System Design", "Machine Learning", "SQL"],
    },
    Seed {
        title: "Amazon ML Summer School",
        description: "Learn ML from Amazon scientists and build real projects.",
        start_in_days: 55,
        end_in_days: 85,
        deadline_in_days: 50,
        registration_url: "https://unstop.com/hackathons/amazon-ml",
        mode: HackathonMode::Online,
        location: "Virtual",
        prize_pool: "Pre-placement Interview",
        image_url: None,
        skills: ["Machine Learning", "Python", "Deep Learning", "AWS"],
    },
];

const COMMUNITY: [Seed; 3] = [
    Seed {
        title: "IIT Bombay Techfest Hackathon",
        description: "Asia's largest science and technology festival hackathon.",
        start_in_days: 70,
        end_in_days: 72,
        deadline_in_days: 65,
        registration_url: "https://techfest.org/hackathon",
        mode: HackathonMode::Hybrid,
        location: "IIT Bombay, Mumbai",
        prize_pool: "₹5,00,000",
        image_url: None,
        skills: ["Full Stack", "AI/ML", "IoT", "Robotics"],
    },
    Seed {
        title: "GDG DevFest India Hackathon",
        description: "Google Developer Groups community hackathon across India.",
        start_in_days: 80,
        end_in_days: 82,
        deadline_in_days: 75,
        registration_url: "https://devfest.gdg.community",
        mode: HackathonMode::Offline,
        location: "Multiple Cities, India",
        prize_pool: "₹2,00,000",
        image_url: None,
        skills: ["Angular", "Flutter", "Firebase", "TensorFlow"],
    },
    Seed {
        title: "MLSA Hackathon 2025",
        description: "Microsoft Learn Student Ambassadors hackathon for students worldwide.",
        start_in_days: 90,
        end_in_days: 92,
        deadline_in_days: 85,
        registration_url: "https://studentambassadors.microsoft.com",
        mode: HackathonMode::Online,
        location: "Global",
        prize_pool: "$5,000",
        image_url: None,
        skills: ["Azure", "GitHub", "VS Code", "Power Automate"],
    },
];

pub fn devfolio(now: DateTime<Utc>) -> Vec<HackathonRecord> {
    build_all(&DEVFOLIO, HackathonSource::Devfolio, now)
}

pub fn devpost(now: DateTime<Utc>) -> Vec<HackathonRecord> {
    build_all(&DEVPOST, HackathonSource::Devpost, now)
}

pub fn unstop(now: DateTime<Utc>) -> Vec<HackathonRecord> {
    build_all(&UNSTOP, HackathonSource::Unstop, now)
}

pub fn community(now: DateTime<Utc>) -> Vec<HackathonRecord> {
    build_all(&COMMUNITY, HackathonSource::Community, now)
}

/// Adapter for platforms without a reachable feed. Never touches the network.
#[derive(Debug, Clone, Copy)]
pub struct StaticAdapter {
    source: HackathonSource,
    dataset: fn(DateTime<Utc>) -> Vec<HackathonRecord>,
}

impl StaticAdapter {
    pub fn unstop() -> Self {
        Self {
            source: HackathonSource::Unstop,
            dataset: unstop,
        }
    }

    pub fn community() -> Self {
        Self {
            source: HackathonSource::Community,
            dataset: community,
        }
    }
}

#[async_trait]
impl SourceAdapter for StaticAdapter {
    fn source(&self) -> HackathonSource {
        self.source
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Static
    }

    async fn fetch(&self, _http: &HttpFetcher, ctx: &AdapterContext) -> Vec<HackathonRecord> {
        let records = (self.dataset)(ctx.now);
        info!(
            run_id = %ctx.run_id,
            source = %self.source,
            count = records.len(),
            "loaded static hackathons"
        );
        records
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use hacksync_core::{validate_record, Validation};

    use super::*;
    use crate::test_support::fetcher;

    #[test]
    fn datasets_are_valid_and_tagged_with_their_source() {
        let now = Utc::now();
        for (source, records) in [
            (HackathonSource::Devfolio, devfolio(now)),
            (HackathonSource::Devpost, devpost(now)),
            (HackathonSource::Unstop, unstop(now)),
            (HackathonSource::Community, community(now)),
        ] {
            assert_eq!(records.len(), 3, "{source}");
            for record in records {
                assert_eq!(record.source, source);
                assert!(record.registration_deadline > now);
                assert!(matches!(validate_record(record), Validation::Valid(_)));
            }
        }
    }

    #[test]
    fn offsets_are_relative_to_the_clock() {
        let now = Utc::now();
        let ethindia = &devfolio(now)[0];
        assert_eq!(ethindia.title, "ETHIndia 2025");
        assert_eq!(ethindia.start_date, now + Duration::days(45));
        assert_eq!(ethindia.end_date, now + Duration::days(47));
        assert_eq!(ethindia.registration_deadline, now + Duration::days(40));
        assert_eq!(ethindia.prize_pool.as_deref(), Some("₹50,00,000"));

        let amazon = &unstop(now)[2];
        assert_eq!(amazon.prize_pool.as_deref(), Some("Pre-placement Interview"));
        assert_eq!(amazon.end_date, now + Duration::days(85));
    }

    #[tokio::test]
    async fn static_adapters_return_their_dataset() {
        let ctx = AdapterContext::new(Utc::now());
        let adapter = StaticAdapter::community();
        let records = adapter.fetch(&fetcher(), &ctx).await;
        assert_eq!(adapter.kind(), AdapterKind::Static);
        assert_eq!(
            records.iter().map(|r| r.title.as_str()).collect::<Vec<_>>(),
            vec![
                "IIT Bombay Techfest Hackathon",
                "GDG DevFest India Hackathon",
                "MLSA Hackathon 2025"
            ]
        );
    }
}
