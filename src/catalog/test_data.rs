//! Fixed offline catalog. Lets a resolution pass run against a handful of
//! well-known combinations without loading the full provider dataset; the
//! ruleset resolution and DNS classification still run for real.

use std::collections::{BTreeMap, BTreeSet};

use super::{Catalog, Region};

impl Catalog {
    pub fn test_data() -> Catalog {
        let regions = [
            ("eu-central-1", "aws", "euc1"),
            ("us-east-2", "aws", "use2"),
            ("eu-west-1", "aws", "euw1"),
            ("il-central-1", "aws", "ilc1"),
            ("cn-north-1", "aws-cn", "cnn1"),
        ];

        let services = ["apigateway", "sts", "ec2", "iam", "secretsmanager"];

        let regions: BTreeMap<String, Region> = regions
            .into_iter()
            .map(|(name, partition, description)| {
                (
                    name.to_string(),
                    Region {
                        name: name.to_string(),
                        partition: partition.to_string(),
                        description: description.to_string(),
                    },
                )
            })
            .collect();

        let services: BTreeSet<String> = services.into_iter().map(String::from).collect();

        Catalog::from_parts(regions, services)
    }
}
