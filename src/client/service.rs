//! Service identifiers and how each one picks its region.

use std::fmt;

/// How a service chooses the region of its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceScope {
    /// Uses the region of the current query.
    QueryRegion,
    /// Uses a region given explicitly by the caller.
    ExplicitRegion,
    /// Global service reached through the connection's default region.
    DefaultRegion,
    /// Always uses one fixed region.
    Pinned(&'static str),
    /// Region-agnostic session keyed by the empty region.
    Global,
    /// Uses the query region, but only where the service is offered.
    SupportedRegion,
}

/// AWS services with a client constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceId {
    /// AWS Backup.
    Backup,
    /// AWS CodeCommit.
    CodeCommit,
    /// Amazon CloudFront.
    CloudFront,
    /// Amazon CloudWatch Logs.
    CloudWatchLogs,
    /// Amazon DynamoDB.
    DynamoDb,
    /// Amazon EC2.
    Ec2,
    /// Amazon ECS.
    Ecs,
    /// Amazon EKS.
    Eks,
    /// Amazon EMR.
    Emr,
    /// AWS Global Accelerator.
    GlobalAccelerator,
    /// AWS Network Firewall.
    NetworkFirewall,
    /// Amazon Pinpoint.
    Pinpoint,
    /// Amazon Route 53.
    Route53,
    /// Amazon SageMaker.
    SageMaker,
    /// AWS Security Hub.
    SecurityHub,
    /// Service Quotas, region-agnostic.
    ServiceQuotas,
    /// Service Quotas in the query region.
    ServiceQuotasRegional,
    /// Amazon SES.
    Ses,
    /// AWS SSO Admin.
    SsoAdmin,
    /// AWS Step Functions.
    StepFunctions,
    /// AWS STS.
    Sts,
}

impl ServiceId {
    /// Every service, in declaration order.
    pub const ALL: &'static [ServiceId] = &[
        ServiceId::Backup,
        ServiceId::CodeCommit,
        ServiceId::CloudFront,
        ServiceId::CloudWatchLogs,
        ServiceId::DynamoDb,
        ServiceId::Ec2,
        ServiceId::Ecs,
        ServiceId::Eks,
        ServiceId::Emr,
        ServiceId::GlobalAccelerator,
        ServiceId::NetworkFirewall,
        ServiceId::Pinpoint,
        ServiceId::Route53,
        ServiceId::SageMaker,
        ServiceId::SecurityHub,
        ServiceId::ServiceQuotas,
        ServiceId::ServiceQuotasRegional,
        ServiceId::Ses,
        ServiceId::SsoAdmin,
        ServiceId::StepFunctions,
        ServiceId::Sts,
    ];

    /// Endpoint prefix, also used as the id for supported-region lookups.
    pub fn endpoint_prefix(self) -> &'static str {
        match self {
            ServiceId::Backup => "backup",
            ServiceId::CodeCommit => "codecommit",
            ServiceId::CloudFront => "cloudfront",
            ServiceId::CloudWatchLogs => "logs",
            ServiceId::DynamoDb => "dynamodb",
            ServiceId::Ec2 => "ec2",
            ServiceId::Ecs => "ecs",
            ServiceId::Eks => "eks",
            ServiceId::Emr => "elasticmapreduce",
            ServiceId::GlobalAccelerator => "globalaccelerator",
            ServiceId::NetworkFirewall => "network-firewall",
            ServiceId::Pinpoint => "pinpoint",
            ServiceId::Route53 => "route53",
            ServiceId::SageMaker => "api.sagemaker",
            ServiceId::SecurityHub => "securityhub",
            ServiceId::ServiceQuotas | ServiceId::ServiceQuotasRegional => "servicequotas",
            ServiceId::Ses => "email",
            ServiceId::SsoAdmin => "sso",
            ServiceId::StepFunctions => "states",
            ServiceId::Sts => "sts",
        }
    }

    /// Region scope of the service.
    pub fn scope(self) -> ServiceScope {
        match self {
            ServiceId::CloudFront | ServiceId::Route53 | ServiceId::Sts => ServiceScope::DefaultRegion,
            // accelerators can only be managed through us-west-2
            ServiceId::GlobalAccelerator => ServiceScope::Pinned("us-west-2"),
            ServiceId::ServiceQuotas => ServiceScope::Global,
            ServiceId::CodeCommit | ServiceId::Pinpoint | ServiceId::SecurityHub => {
                ServiceScope::SupportedRegion
            }
            ServiceId::Ec2 => ServiceScope::ExplicitRegion,
            _ => ServiceScope::QueryRegion,
        }
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
